//! Second MCP target (`DASHBOARD_MCP_SERVER_URL`), optionally overridden
//! per request by a `serverUrl` body field.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::{json, Value};
use url::Url;

use super::resources::{html_payload, read};
use super::{json_response, parse_body, raw_error, AppState};
use crate::client::{parse_server_url, require_server_url};
use crate::error::HostError;
use crate::extract::ToolResult;

pub const DASHBOARD_HELLO_TOOL: &str = "dashboard_mcp_hello";

fn target(st: &AppState, body: &Value) -> Result<Url, HostError> {
    match body.get("serverUrl").and_then(Value::as_str).map(str::trim) {
        Some(custom) if !custom.is_empty() => Ok(parse_server_url(custom)?),
        _ => Ok(require_server_url(st.config.dashboard_server_url.as_ref(), "DASHBOARD_MCP_SERVER_URL")?.clone()),
    }
}

/// `POST /dashboard/hello {serverUrl?}` → `{text, raw}`.
pub async fn hello(State(st): State<AppState>, body: String) -> Response {
    let outcome = async {
        let body = parse_body(&body)?;
        let url = target(&st, &body)?;
        let call = st.mcp.call_tool(&url, DASHBOARD_HELLO_TOOL, json!({})).await?;
        let tool = ToolResult::from_raw(call.raw);
        Ok::<_, HostError>((tool.text, tool.raw))
    }
    .await;

    match outcome {
        Ok((text, raw)) => json_response(StatusCode::OK, json!({ "text": text, "raw": raw })),
        Err(err) => raw_error(&err),
    }
}

/// `GET /dashboard/resource`, configured target only.
pub async fn resource(State(st): State<AppState>) -> Response {
    read_dashboard(&st, &json!({})).await
}

/// `POST /dashboard/resource {serverUrl?}`.
pub async fn resource_at(State(st): State<AppState>, body: String) -> Response {
    match parse_body(&body) {
        Ok(body) => read_dashboard(&st, &body).await,
        Err(err) => raw_error(&err),
    }
}

async fn read_dashboard(st: &AppState, body: &Value) -> Response {
    let outcome = async {
        let url = target(st, body)?;
        read(&st.mcp, &url, &st.config.dashboard_resource_id).await
    }
    .await;

    match outcome {
        Ok(resource) => html_payload(resource),
        Err(err) => raw_error(&err),
    }
}
