use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::{json, Value};

use super::{json_response, log_failure, parse_body, raw_error, required_str, AppState};
use crate::chat::trim_to_byte_size;
use crate::error::HostError;
use crate::extract::{find_ui_tools, tool_names, NormalizedToolResult, ToolResult};
use crate::protocol::JsonRpcError;

pub const HELLO_TOOL: &str = "hello_world";

/// Byte budget of the `/hello` result text.
const MAX_TOOL_BYTES: usize = 10 * 1024;

/// `POST /tool-call {name, arguments}` → `{text, raw}`.
pub async fn call_tool(State(st): State<AppState>, body: String) -> Response {
    match call_tool_inner(&st, &body).await {
        Ok(normalized) => json_response(StatusCode::OK, json!(normalized)),
        Err(err) => {
            log_failure(&err);
            json_response(
                err.status_code(),
                json!({ "text": "", "raw": { "error": err.payload_value() } }),
            )
        }
    }
}

async fn call_tool_inner(st: &AppState, body: &str) -> Result<NormalizedToolResult, HostError> {
    let body = parse_body(body)?;
    let name = required_str(&body, "name", "Tool name is required")?;
    let arguments = body
        .get("arguments")
        .filter(|a| a.is_object())
        .cloned()
        .unwrap_or_else(|| json!({}));

    let url = st.mcp_server_url()?;
    let call = st.mcp.call_tool(url, name, arguments).await?;
    Ok(ToolResult::from_raw(call.raw).normalized())
}

/// `GET /tools-list` → `{raw}`.
pub async fn tools_list(State(st): State<AppState>) -> Response {
    let outcome = async {
        let url = st.mcp_server_url()?;
        Ok::<_, HostError>(st.mcp.list_tools(url).await?)
    }
    .await;
    match outcome {
        Ok(call) => json_response(StatusCode::OK, json!({ "raw": call.raw })),
        Err(err) => raw_error(&err),
    }
}

/// The `result` of a `tools/list`, or the upstream error.
async fn listed_tools(st: &AppState) -> Result<Value, HostError> {
    let url = st.mcp_server_url()?;
    let raw = st.mcp.list_tools(url).await?.raw;
    upstream_error(&raw)?;
    Ok(raw.get("result").cloned().unwrap_or(Value::Null))
}

/// An `error` member of the upstream document becomes `HostError::Upstream`.
fn upstream_error(raw: &Value) -> Result<(), HostError> {
    match raw.get("error") {
        Some(err) if !err.is_null() => Err(HostError::Upstream(JsonRpcError::from_loose(
            err,
            JsonRpcError::INTERNAL_ERROR,
            "Upstream error.",
        ))),
        _ => Ok(()),
    }
}

/// `GET /tools` → `{tools: [...]}`.
pub async fn tools(State(st): State<AppState>) -> Response {
    match listed_tools(&st).await {
        Ok(result) => {
            let tools = result.get("tools").cloned().unwrap_or_else(|| json!([]));
            json_response(StatusCode::OK, json!({ "tools": tools }))
        }
        Err(err) => error_body(&err),
    }
}

/// `GET /ui-tools` → tools that declare an embedded app resource.
pub async fn ui_tools(State(st): State<AppState>) -> Response {
    match listed_tools(&st).await {
        Ok(result) => json_response(StatusCode::OK, json!({ "tools": find_ui_tools(&result) })),
        Err(err) => error_body(&err),
    }
}

/// `POST /hello` → `{resultText}` from the `hello_world` tool, 404 when it
/// is not advertised.
pub async fn hello(State(st): State<AppState>) -> Response {
    let listed = match listed_tools(&st).await {
        Ok(result) => result,
        Err(err) => return error_body(&err),
    };
    if !tool_names(&listed).contains(&HELLO_TOOL) {
        return json_response(
            StatusCode::NOT_FOUND,
            json!({ "error": format!("Tool {HELLO_TOOL} not found.") }),
        );
    }

    let outcome = async {
        let url = st.mcp_server_url()?;
        let raw = st.mcp.call_tool(url, HELLO_TOOL, json!({})).await?.raw;
        upstream_error(&raw)?;
        Ok::<_, HostError>(ToolResult::from_raw(raw))
    }
    .await;

    match outcome {
        Ok(tool) => {
            let text = tool.text.trim();
            let text = if text.is_empty() { "[no text]" } else { text };
            json_response(
                StatusCode::OK,
                json!({ "resultText": trim_to_byte_size(text, MAX_TOOL_BYTES) }),
            )
        }
        Err(err) => error_body(&err),
    }
}

fn error_body(err: &HostError) -> Response {
    log_failure(err);
    json_response(err.status_code(), json!({ "error": err.payload_value() }))
}
