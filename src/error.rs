use std::time::Duration;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::client::McpCallError;
use crate::protocol::JsonRpcError;

/// Error kind surfaced to the UI (v0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigError,
    TransportError,
    ProtocolError,
    UpstreamRpcError,
    ValidationError,
    RateLimited,
}

impl ErrorKind {
    /// Map to the HTTP status of the boundary response.
    ///
    /// Bad input or missing config → 400
    /// Upstream misbehaviour        → 502
    /// Rate limit                   → 429
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::ConfigError | Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::TransportError | Self::ProtocolError | Self::UpstreamRpcError => {
                StatusCode::BAD_GATEWAY
            }
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

/// Every failure a boundary operation can report.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("{0}")]
    Config(String),
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        body: String,
        message: String,
    },
    #[error("{0}")]
    Protocol(String),
    #[error("upstream error {}: {}", .0.code, .0.message)]
    Upstream(JsonRpcError),
    #[error("{0}")]
    Validation(String),
    #[error("rate limit exceeded, retry in {} ms", .retry_after.as_millis())]
    RateLimited { retry_after: Duration },
}

impl HostError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::ConfigError,
            Self::Transport { .. } => ErrorKind::TransportError,
            Self::Protocol(_) => ErrorKind::ProtocolError,
            Self::Upstream(_) => ErrorKind::UpstreamRpcError,
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind().http_status()
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
            status: match self {
                Self::Transport { status, .. } => *status,
                _ => None,
            },
            code: match self {
                Self::Upstream(e) => Some(e.code),
                _ => None,
            },
        }
    }

    /// The payload as a JSON value, for embedding under `raw.error`.
    pub fn payload_value(&self) -> serde_json::Value {
        serde_json::to_value(self.payload()).unwrap_or(serde_json::Value::Null)
    }
}

impl From<McpCallError> for HostError {
    fn from(err: McpCallError) -> Self {
        match err {
            McpCallError::Config(m) => Self::Config(m),
            McpCallError::Transport { status, body, message } => Self::Transport { status, body, message },
            McpCallError::Protocol(m) => Self::Protocol(m),
        }
    }
}

/// Structured error object embedded in route responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}
