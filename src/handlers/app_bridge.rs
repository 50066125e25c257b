//! `POST /app-bridge {method, params, serverUrl?}`: the same-origin hop the
//! embedded-app bridge forwards frame calls through.
//!
//! The upstream JSON-RPC document comes back unmodified under `raw`, so an
//! upstream `error` object reaches the frame verbatim.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::{json, Value};

use super::{json_response, log_failure, parse_body, AppState};
use crate::client::parse_server_url;
use crate::error::HostError;
use crate::protocol::JsonRpcError;

/// Route the preview page's bridge script posts to.
pub const BRIDGE_ENDPOINT: &str = "/app-bridge";

pub async fn handle(State(st): State<AppState>, body: String) -> Response {
    let body = match parse_body(&body) {
        Ok(b) => b,
        Err(err) => return rpc_failure(err.status_code(), JsonRpcError::invalid_request_with(err.to_string())),
    };
    let Some(method) = body.get("method").and_then(Value::as_str).filter(|m| !m.is_empty()) else {
        return rpc_failure(StatusCode::BAD_REQUEST, JsonRpcError::invalid_request_with("method is required"));
    };
    let params = body
        .get("params")
        .filter(|p| p.is_object())
        .cloned()
        .unwrap_or_else(|| json!({}));

    let outcome = async {
        let url = match body.get("serverUrl").and_then(Value::as_str) {
            Some(custom) => parse_server_url(custom)?,
            None => st.mcp_server_url()?.clone(),
        };
        Ok::<_, HostError>(st.mcp.call(&url, method, params).await?)
    }
    .await;

    match outcome {
        Ok(call) => json_response(StatusCode::OK, json!({ "raw": call.raw })),
        Err(err) => {
            log_failure(&err);
            let error = JsonRpcError::server_error(err.to_string()).with_data(err.payload_value());
            rpc_failure(err.status_code(), error)
        }
    }
}

fn rpc_failure(status: StatusCode, error: JsonRpcError) -> Response {
    json_response(status, json!({ "raw": { "error": error } }))
}
