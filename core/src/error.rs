use serde::Serialize;

/// Structured error payload attached to JSON-RPC errors, designed for agents.
/// Enough detail for an agent to understand what went wrong and how to fix it.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    /// Machine-readable error code (see [`codes`])
    pub error: String,
    /// Human/agent-readable description of what went wrong
    pub message: String,
    /// Which argument caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

impl ErrorPayload {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            field: None,
            docs_hint: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_docs_hint(mut self, docs_hint: impl Into<String>) -> Self {
        self.docs_hint = Some(docs_hint.into());
        self
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Error codes used across the tool surface
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const UNKNOWN_TOOL: &str = "unknown_tool";
}
