//! Local input checks applied to tool arguments before any network call.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 100;
pub const DATASET_NAME_MIN_LEN: usize = 1;
pub const DATASET_NAME_MAX_LEN: usize = 100;
/// Upper bound on the serialized size of a dataset payload (5 MiB).
pub const DATASET_DATA_MAX_BYTES: usize = 5 * 1024 * 1024;

pub const USERNAME_PATTERN: &str = "^[a-zA-Z0-9_-]+$";

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(USERNAME_PATTERN).expect("username pattern is a valid regex"));

/// Rejected tool input. Always names the offending argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field '{field}'")]
    Missing { field: String },
    #[error("'{field}' must be a {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("'{field}' must be at least {min} characters")]
    TooShort { field: String, min: usize },
    #[error("'{field}' must be at most {max} characters")]
    TooLong { field: String, max: usize },
    #[error("'{field}' may only contain letters, digits, underscore and dash")]
    InvalidCharacters { field: String },
    #[error("'{field}' must serialize to at most {max_bytes} bytes of JSON (got {actual_bytes})")]
    TooLarge {
        field: String,
        max_bytes: usize,
        actual_bytes: usize,
    },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Missing { field }
            | ValidationError::WrongType { field, .. }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::InvalidCharacters { field }
            | ValidationError::TooLarge { field, .. } => field,
        }
    }

    /// Short machine-readable name of the violated constraint.
    pub fn constraint(&self) -> &'static str {
        match self {
            ValidationError::Missing { .. } => "required",
            ValidationError::WrongType { .. } => "type",
            ValidationError::TooShort { .. } => "min_length",
            ValidationError::TooLong { .. } => "max_length",
            ValidationError::InvalidCharacters { .. } => "pattern",
            ValidationError::TooLarge { .. } => "max_bytes",
        }
    }
}

pub fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ValidationError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ValidationError::Missing {
            field: key.to_string(),
        }),
        Some(Value::String(v)) => Ok(v.clone()),
        Some(_) => Err(ValidationError::WrongType {
            field: key.to_string(),
            expected: "string",
        }),
    }
}

/// Any JSON value, `null` included, as long as the key is present.
pub fn required_value(args: &Map<String, Value>, key: &str) -> Result<Value, ValidationError> {
    args.get(key).cloned().ok_or_else(|| ValidationError::Missing {
        field: key.to_string(),
    })
}

pub fn optional_value(args: &Map<String, Value>, key: &str) -> Option<Value> {
    args.get(key).cloned()
}

pub fn check_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    // UTF-16 code units, the unit JSON Schema clients in JavaScript count.
    let len = value.encode_utf16().count();
    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }
    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

pub fn check_json_size(field: &str, value: &Value, max_bytes: usize) -> Result<(), ValidationError> {
    let actual_bytes = serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0);
    if actual_bytes > max_bytes {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max_bytes,
            actual_bytes,
        });
    }
    Ok(())
}

pub fn validate_username(field: &str, value: &str) -> Result<(), ValidationError> {
    check_length(field, value, USERNAME_MIN_LEN, USERNAME_MAX_LEN)?;
    if !USERNAME_RE.is_match(value) {
        return Err(ValidationError::InvalidCharacters {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub fn validate_password(field: &str, value: &str) -> Result<(), ValidationError> {
    check_length(field, value, PASSWORD_MIN_LEN, PASSWORD_MAX_LEN)
}

pub fn validate_dataset_name(field: &str, value: &str) -> Result<(), ValidationError> {
    check_length(field, value, DATASET_NAME_MIN_LEN, DATASET_NAME_MAX_LEN)
}

pub fn validate_dataset_data(field: &str, value: &Value) -> Result<(), ValidationError> {
    check_json_size(field, value, DATASET_DATA_MAX_BYTES)
}
