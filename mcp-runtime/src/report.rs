//! Human-readable tool reports: one status line plus a fixed usage hint.

use bakul_core::auth::masked_key;
use serde_json::Value;

use crate::gateway::{ApiCallResult, TransportError};
use crate::tools::ToolName;
use crate::util::to_pretty_json;

pub const MISSING_API_KEY_STATUS: &str =
    "Error: No API key provided. Set BAKUL_API_KEY environment variable.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub status_line: String,
    pub usage_hint: String,
    pub is_error: bool,
}

impl Report {
    fn new(status_line: String, usage_hint: &str, is_error: bool) -> Self {
        Self {
            status_line,
            usage_hint: usage_hint.to_string(),
            is_error,
        }
    }

    /// Text block returned to the host.
    pub fn render(&self) -> String {
        format!("{}\n\nTool Usage: {}", self.status_line, self.usage_hint)
    }
}

struct Phrasing {
    /// Leading noun of the status line, e.g. "Dataset creation".
    subject: &'static str,
    /// Hint attached when the API answered, whatever the status.
    result_hint: &'static str,
    /// Hint attached when the API could not be reached.
    transport_hint: &'static str,
}

fn phrasing(tool: ToolName) -> Phrasing {
    match tool {
        ToolName::HealthCheck => Phrasing {
            subject: "Health check",
            result_hint: "Use this to verify API availability before making other requests.",
            transport_hint: "API appears to be unavailable. Check network connection and try again.",
        },
        ToolName::RegisterUser => Phrasing {
            subject: "Registration",
            result_hint: "Save the API key from successful registration for use with other tools that require authentication.",
            transport_hint: "Check your network connection and verify the provided credentials are valid.",
        },
        ToolName::RotateApiKey => Phrasing {
            subject: "Key rotation",
            result_hint: "Update your stored API key with the new key returned. The old key is now invalid.",
            transport_hint: "Verify your current API key is valid and not expired.",
        },
        ToolName::CreateDataset => Phrasing {
            subject: "Dataset creation",
            result_hint: "Save the dataset ID from successful creation for future updates or sharing. Dataset is private by default.",
            transport_hint: "Verify your API key is valid and check the dataset content format.",
        },
        ToolName::UpdateDataset => Phrasing {
            subject: "Dataset update",
            result_hint: "Changes are immediately available. Use get_public_dataset to verify updates for public datasets.",
            transport_hint: "Verify the dataset ID exists and you have permission to update it.",
        },
        ToolName::GetPublicDataset => Phrasing {
            subject: "Dataset retrieval",
            result_hint: "This data can be analyzed, processed, or used as input for other operations. Only public datasets are accessible via this method.",
            transport_hint: "Verify the username and dataset ID are correct and that the dataset is public.",
        },
        ToolName::GetPublicDatasetSchema => Phrasing {
            subject: "Schema retrieval",
            result_hint: "Use this schema to understand the structure and types of data in the dataset before processing or analysis.",
            transport_hint: "Verify the dataset exists, is public, and has a defined schema.",
        },
        ToolName::GetApiKeyStatus => Phrasing {
            subject: "API Key Status",
            result_hint: "Your API key is ready for use with dataset operations.",
            transport_hint: "Verify your API key and network connection.",
        },
    }
}

/// Report for a request the API answered, 4xx/5xx included.
pub fn api_result(tool: ToolName, result: &ApiCallResult) -> Report {
    let phrasing = phrasing(tool);
    let status_line = match tool {
        ToolName::HealthCheck => format!(
            "Health Status: {} - {}",
            result.status,
            body_as_text(&result.body)
        ),
        _ => format!(
            "{} {}: {}",
            phrasing.subject,
            if result.is_success() {
                "successful"
            } else {
                "failed"
            },
            to_pretty_json(&result.body)
        ),
    };
    Report::new(status_line, phrasing.result_hint, !result.is_success())
}

pub fn transport_failure(tool: ToolName, err: &TransportError) -> Report {
    let phrasing = phrasing(tool);
    let status_line = match tool {
        ToolName::GetApiKeyStatus => format!("API Key Status: Error checking status - {err}"),
        _ => format!("{} failed: {err}", phrasing.subject),
    };
    Report::new(status_line, phrasing.transport_hint, true)
}

pub fn missing_api_key(tool: ToolName) -> Report {
    let hint = match tool {
        ToolName::RotateApiKey => {
            "Register a user first to get an API key, then use it for key rotation."
        }
        _ => "Register a user first to get an API key, then use it for dataset operations.",
    };
    Report::new(MISSING_API_KEY_STATUS.to_string(), hint, true)
}

pub fn key_not_configured() -> Report {
    Report::new(
        "API Key Status: Not configured".to_string(),
        "Set BAKUL_API_KEY environment variable or register a new user to get an API key.",
        false,
    )
}

pub fn key_configured(api_key: &str, api_healthy: bool) -> Report {
    Report::new(
        format!(
            "API Key Status: Configured ({})\nAPI Health: {}",
            masked_key(api_key),
            if api_healthy { "Healthy" } else { "Unhealthy" }
        ),
        phrasing(ToolName::GetApiKeyStatus).result_hint,
        false,
    )
}

fn body_as_text(body: &Value) -> String {
    match body {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
