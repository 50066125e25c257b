use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::request::RpcId;

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 response layer
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 response envelope.
///
/// Exactly one of `result` / `error` is present on the wire; the
/// [`RpcOutcome`] sum type makes that structural.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<RpcId>,
    #[serde(flatten)]
    pub outcome: RpcOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RpcOutcome {
    Success { result: Value },
    Failure { error: JsonRpcError },
}

/// Why a JSON document could not be read as a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseShapeError {
    #[error("response is not a JSON object")]
    NotAnObject,
    #[error("response missing result")]
    MissingOutcome,
    #[error("response carries both result and error")]
    BothOutcomes,
    #[error("malformed error object: {0}")]
    MalformedError(String),
}

impl JsonRpcResponse {
    pub fn success(id: Option<RpcId>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            outcome: RpcOutcome::Success { result },
        }
    }

    pub fn error(id: Option<RpcId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            outcome: RpcOutcome::Failure { error },
        }
    }

    /// Decode an untyped JSON document into a response.
    ///
    /// The `id` is read leniently: a missing or non-scalar id becomes `None`.
    pub fn from_value(value: &Value) -> Result<Self, ResponseShapeError> {
        let obj = value.as_object().ok_or(ResponseShapeError::NotAnObject)?;
        let id = obj.get("id").and_then(RpcId::from_value);
        let jsonrpc = obj
            .get("jsonrpc")
            .and_then(Value::as_str)
            .unwrap_or("2.0")
            .to_string();

        let outcome = match (obj.get("result"), obj.get("error")) {
            (Some(_), Some(_)) => return Err(ResponseShapeError::BothOutcomes),
            (Some(result), None) => RpcOutcome::Success { result: result.clone() },
            (None, Some(error)) => {
                let error: JsonRpcError = serde_json::from_value(error.clone())
                    .map_err(|e| ResponseShapeError::MalformedError(e.to_string()))?;
                RpcOutcome::Failure { error }
            }
            (None, None) => return Err(ResponseShapeError::MissingOutcome),
        };

        Ok(Self { jsonrpc, id, outcome })
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            RpcOutcome::Success { result } => Some(result),
            RpcOutcome::Failure { .. } => None,
        }
    }

    pub fn rpc_error(&self) -> Option<&JsonRpcError> {
        match &self.outcome {
            RpcOutcome::Success { .. } => None,
            RpcOutcome::Failure { error } => Some(error),
        }
    }

    pub fn to_value(&self) -> Value {
        // Only `Value`, `String`, `i64` and `i32` fields: serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// JSON-RPC 2.0 error object (protocol-level errors).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const SERVER_ERROR: i32 = -32000;

    pub fn invalid_request_with(detail: impl Into<String>) -> Self {
        Self { code: Self::INVALID_REQUEST, message: detail.into(), data: None }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: Self::METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self { code: Self::INVALID_PARAMS, message: detail.into(), data: None }
    }

    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self { code: Self::INTERNAL_ERROR, message: detail.into(), data: None }
    }

    pub fn server_error(detail: impl Into<String>) -> Self {
        Self { code: Self::SERVER_ERROR, message: detail.into(), data: None }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Lenient read of an error object found inside an arbitrary payload.
    ///
    /// Missing `code` falls back to `default_code`, missing `message` to
    /// `default_message`; `data` is carried verbatim when present.
    pub fn from_loose(value: &Value, default_code: i32, default_message: &str) -> Self {
        let Some(obj) = value.as_object() else {
            return Self {
                code: default_code,
                message: default_message.to_string(),
                data: Some(value.clone()),
            };
        };
        Self {
            code: obj
                .get("code")
                .and_then(Value::as_i64)
                .and_then(|c| i32::try_from(c).ok())
                .unwrap_or(default_code),
            message: obj
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(default_message)
                .to_string(),
            data: obj.get("data").cloned(),
        }
    }
}
