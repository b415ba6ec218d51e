//! Maps validated tool calls onto gateway requests and turns every outcome into a [`Report`].

use bakul_core::config::ApiKeySource;
use bakul_core::validation::ValidationError;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::gateway::{ApiRequest, Gateway};
use crate::report::{self, Report};
use crate::tools::{ToolCall, ToolName};

/// Rejections that happen before any report exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for tool {tool}: {source}")]
    InvalidInput {
        tool: &'static str,
        #[source]
        source: ValidationError,
    },
}

pub struct Dispatcher<G, K> {
    gateway: G,
    keys: K,
}

impl<G: Gateway, K: ApiKeySource> Dispatcher<G, K> {
    pub fn new(gateway: G, keys: K) -> Self {
        Self { gateway, keys }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Validates `args` for `name` and runs the tool.
    pub async fn invoke(&self, name: &str, args: &Map<String, Value>) -> Result<Report, DispatchError> {
        let tool =
            ToolName::parse(name).ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;
        let call = ToolCall::from_args(tool, args).map_err(|source| {
            tracing::info!(tool = tool.as_str(), field = source.field(), "tool input rejected");
            DispatchError::InvalidInput {
                tool: tool.as_str(),
                source,
            }
        })?;
        Ok(self.dispatch(call).await)
    }

    /// Runs an already validated call. Never fails: every outcome is a report.
    pub async fn dispatch(&self, call: ToolCall) -> Report {
        let tool = call.tool();
        let request = match call {
            ToolCall::GetApiKeyStatus => return self.api_key_status().await,
            ToolCall::HealthCheck => ApiRequest::get("/health").expect_text(),
            ToolCall::RegisterUser(input) => ApiRequest::post("/register")
                .with_json(json!({ "username": input.username, "password": input.password })),
            ToolCall::RotateApiKey => ApiRequest::post("/rotate-key"),
            ToolCall::CreateDataset(input) => ApiRequest::post("/datasets")
                .with_json(serde_json::to_value(&input).unwrap_or(Value::Null)),
            ToolCall::UpdateDataset(input) => {
                ApiRequest::put(format!("/datasets/{}", input.dataset_id))
                    .with_json(json!({ "data": input.data }))
            }
            ToolCall::GetPublicDataset(target) => {
                ApiRequest::get(format!("/datasets/{}/{}", target.username, target.dataset_id))
            }
            ToolCall::GetPublicDatasetSchema(target) => ApiRequest::get(format!(
                "/datasets/{}/{}/schema",
                target.username, target.dataset_id
            )),
        };

        let request = if tool.requires_auth() {
            let api_key = self.keys.resolve_api_key();
            if api_key.is_empty() {
                tracing::info!(tool = tool.as_str(), "no API key configured; skipping request");
                return report::missing_api_key(tool);
            }
            request.with_bearer(api_key)
        } else {
            request
        };

        self.forward(tool, request).await
    }

    async fn forward(&self, tool: ToolName, request: ApiRequest) -> Report {
        match self.gateway.call(request).await {
            Ok(result) => {
                tracing::info!(
                    tool = tool.as_str(),
                    status = result.status,
                    ok = result.is_success(),
                    "tool call completed"
                );
                report::api_result(tool, &result)
            }
            Err(err) => {
                tracing::warn!(tool = tool.as_str(), error = %err, "API request failed");
                report::transport_failure(tool, &err)
            }
        }
    }

    async fn api_key_status(&self) -> Report {
        let api_key = self.keys.resolve_api_key();
        if api_key.is_empty() {
            return report::key_not_configured();
        }
        match self.gateway.call(ApiRequest::get("/health").expect_text()).await {
            Ok(result) => report::key_configured(&api_key, result.is_success()),
            Err(err) => {
                tracing::warn!(error = %err, "health probe failed");
                report::transport_failure(ToolName::GetApiKeyStatus, &err)
            }
        }
    }
}
