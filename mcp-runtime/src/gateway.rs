//! HTTP access to the Bakul API.
//!
//! HTTP-level failures (4xx/5xx) are ordinary [`ApiCallResult`]s. Only
//! failures to reach the server or to decode its reply are [`TransportError`]s.

use std::future::Future;

use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

use crate::util::client;

/// How a response body is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub auth_token: Option<String>,
    pub json_body: Option<Value>,
    pub body_kind: BodyKind,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            auth_token: None,
            json_body: None,
            body_kind: BodyKind::Json,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Only meaningful for POST and PUT.
    pub fn with_json(mut self, body: Value) -> Self {
        debug_assert!(
            self.method == Method::POST || self.method == Method::PUT,
            "JSON bodies are only sent with POST or PUT"
        );
        self.json_body = Some(body);
        self
    }

    pub fn expect_text(mut self) -> Self {
        self.body_kind = BodyKind::Text;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiCallResult {
    pub status: u16,
    pub body: Value,
}

impl ApiCallResult {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid request URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("failed to reach {url}: {message}")]
    Request { url: String, message: String },
    #[error("failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
    #[error("invalid JSON in response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Seam between the dispatcher and the network.
pub trait Gateway: Send + Sync {
    fn call(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiCallResult, TransportError>> + Send;
}

pub struct HttpGateway {
    base_url: String,
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: bakul_core::config::normalize_api_base(&base_url.into()),
            http: client(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Gateway for HttpGateway {
    async fn call(&self, request: ApiRequest) -> Result<ApiCallResult, TransportError> {
        let url = self.url_for(&request.path);
        let parsed = reqwest::Url::parse(&url).map_err(|e| TransportError::InvalidUrl {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let mut builder = self.http.request(request.method.clone(), parsed);
        if let Some(token) = &request.auth_token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        if let Some(body) = &request.json_body {
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, %url, "sending API request");
        let response = builder.send().await.map_err(|e| TransportError::Request {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| TransportError::Body {
            url: url.clone(),
            message: e.to_string(),
        })?;
        let body = parse_response_body(&bytes, request.body_kind).map_err(|message| {
            TransportError::Decode {
                url: url.clone(),
                message,
            }
        })?;

        Ok(ApiCallResult { status, body })
    }
}

/// Text bodies become `Value::String`; JSON bodies must decode.
pub fn parse_response_body(bytes: &[u8], kind: BodyKind) -> Result<Value, String> {
    match kind {
        BodyKind::Text => Ok(Value::String(String::from_utf8_lossy(bytes).to_string())),
        BodyKind::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
    }
}
