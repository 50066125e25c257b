pub mod app_bridge;
pub mod chat;
pub mod dashboard;
pub mod health;
pub mod resources;
pub mod tools;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use url::Url;

use crate::chat::ChatClient;
use crate::client::{require_server_url, McpCallError, McpClient};
use crate::config::HostConfig;
use crate::error::HostError;
use crate::rate_limit::RateLimiter;

/// Shared state of every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<HostConfig>,
    pub mcp: McpClient,
    pub chat: ChatClient,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: HostConfig) -> Result<Self, McpCallError> {
        let mcp = McpClient::new(config.request_timeout)?;
        let chat_http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| McpCallError::Config(format!("build http client: {e}")))?;
        let chat = ChatClient::new(
            chat_http,
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
        );
        let limiter = Arc::new(RateLimiter::new(config.rate_limit_window));
        Ok(Self {
            config: Arc::new(config),
            mcp,
            chat,
            limiter,
        })
    }

    /// `MCP_SERVER_URL`, or a config error before any network attempt.
    pub fn mcp_server_url(&self) -> Result<&Url, HostError> {
        Ok(require_server_url(self.config.mcp_server_url.as_ref(), "MCP_SERVER_URL")?)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::handle))
        .route("/tool-call", post(tools::call_tool))
        .route("/tools-list", get(tools::tools_list))
        .route("/tools", get(tools::tools))
        .route("/ui-tools", get(tools::ui_tools))
        .route("/hello", post(tools::hello))
        .route("/read-resource", post(resources::read_resource))
        .route("/resource", get(resources::resource))
        .route("/resources-list", get(resources::resources_list))
        .route("/preview", get(resources::preview))
        .route("/dashboard/hello", post(dashboard::hello))
        .route("/dashboard/resource", get(dashboard::resource).post(dashboard::resource_at))
        .route(app_bridge::BRIDGE_ENDPOINT, post(app_bridge::handle))
        .route("/chat", post(chat::handle))
        .with_state(state)
}

/// Parse a JSON request body. An empty body reads as `{}`.
pub(crate) fn parse_body(body: &str) -> Result<Value, HostError> {
    if body.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|e| HostError::Validation(format!("request body is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(HostError::Validation("request body must be a JSON object".into()));
    }
    Ok(value)
}

/// A required non-empty string field of a request body.
pub(crate) fn required_str<'a>(body: &'a Value, field: &str, message: &str) -> Result<&'a str, HostError> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| HostError::Validation(message.to_string()))
}

pub(crate) fn json_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

/// `{raw: {error: ...}}` with the status of the error kind.
pub(crate) fn raw_error(err: &HostError) -> Response {
    log_failure(err);
    json_response(err.status_code(), serde_json::json!({ "raw": { "error": err.payload_value() } }))
}

pub(crate) fn log_failure(err: &HostError) {
    match err {
        HostError::Validation(_) | HostError::RateLimited { .. } => {
            tracing::info!(kind = ?err.kind(), error = %err, "request rejected")
        }
        _ => tracing::warn!(kind = ?err.kind(), error = %err, "request failed"),
    }
}
