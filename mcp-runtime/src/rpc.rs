//! JSON-RPC 2.0 envelopes exchanged with the host.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Serialize)]
pub(crate) struct RpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl RpcError {
    fn new(code: i64, message: String) -> Self {
        Self {
            code,
            message,
            data: None,
        }
    }

    pub(crate) fn parse_error(reason: impl Into<String>) -> Self {
        Self::new(-32700, format!("Parse error: {}", reason.into()))
    }

    pub(crate) fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(-32600, format!("Invalid request: {}", reason.into()))
    }

    pub(crate) fn method_not_found(method: &str) -> Self {
        Self::new(-32601, format!("Unsupported method '{method}'"))
    }

    pub(crate) fn invalid_params(reason: impl Into<String>) -> Self {
        Self::new(-32602, reason.into())
    }

    pub(crate) fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl RpcResponse {
    pub(crate) fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub(crate) fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }

    pub(crate) fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    jsonrpc: Option<String>,
    /// `Some(Value::Null)` for an explicit `"id": null`, `None` when absent.
    #[serde(default, deserialize_with = "present")]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Value,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A single inbound message that passed envelope checks.
#[derive(Debug, PartialEq)]
pub(crate) enum Inbound {
    Request {
        id: Value,
        method: String,
        params: Value,
    },
    Notification {
        method: String,
    },
    /// Reply to a server-initiated request. This server sends none, so these are dropped.
    Reply,
}

impl Inbound {
    /// Rejections come back as the error response to send.
    pub(crate) fn parse(message: Value) -> Result<Self, RpcResponse> {
        let envelope: Envelope = serde_json::from_value(message).map_err(|e| {
            RpcResponse::failure(Value::Null, RpcError::invalid_request(e.to_string()))
        })?;

        if envelope.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
            return Err(RpcResponse::failure(
                envelope.id.unwrap_or(Value::Null),
                RpcError::invalid_request("expected jsonrpc \"2.0\""),
            ));
        }

        Ok(match (envelope.id, envelope.method) {
            (Some(id), Some(method)) => Inbound::Request {
                id,
                method,
                params: envelope.params,
            },
            (None, Some(method)) => Inbound::Notification { method },
            (_, None) => Inbound::Reply,
        })
    }
}
