//! JSON-RPC 2.0 client for a remote MCP server over plain or SSE-framed HTTP.
//!
//! One call is one best-effort round trip: no retries, no caching, no
//! batching. The only suspension point is the outbound POST, bounded by the
//! client's timeout.

pub mod sse;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::protocol::{methods, JsonRpcRequest, JsonRpcResponse, ResourceReadParams, RpcId, ToolCallParams};

/// Upper bound on the response body kept in a transport error.
pub const MAX_ERROR_BODY_CHARS: usize = 2000;

pub const ACCEPT_BOTH: &str = "application/json, text/event-stream";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum McpCallError {
    /// No usable server URL; no network attempt was made.
    #[error("{0}")]
    Config(String),
    /// Unreachable server, timeout, or a non-2xx status.
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        body: String,
        message: String,
    },
    /// The server answered 2xx with a body that is neither JSON nor a
    /// parseable event stream, or a JSON document that is not a JSON-RPC response.
    #[error("{0}")]
    Protocol(String),
}

/// Outcome of one successful round trip.
#[derive(Debug, Clone)]
pub struct RpcCall {
    /// The response document, unmodified (last data frame for SSE bodies).
    pub raw: Value,
    /// The exact response body text.
    pub raw_text: String,
    pub status: u16,
}

impl RpcCall {
    pub fn response(&self) -> Result<JsonRpcResponse, McpCallError> {
        JsonRpcResponse::from_value(&self.raw).map_err(|e| McpCallError::Protocol(e.to_string()))
    }
}

/// HTTP JSON-RPC client. Cheap to clone; clones share the connection pool
/// and the request counter.
#[derive(Debug, Clone)]
pub struct McpClient {
    http: reqwest::Client,
    requests_sent: Arc<AtomicU64>,
}

impl McpClient {
    pub fn new(timeout: Duration) -> Result<Self, McpCallError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| McpCallError::Config(format!("build http client: {e}")))?;
        Ok(Self {
            http,
            requests_sent: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Number of HTTP requests this client (and its clones) attempted.
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    pub async fn call(
        &self,
        server_url: &Url,
        method: &str,
        params: Value,
    ) -> Result<RpcCall, McpCallError> {
        let req = JsonRpcRequest::new(RpcId::fresh(), method, params);
        self.requests_sent.fetch_add(1, Ordering::Relaxed);

        let resp = self
            .http
            .post(server_url.clone())
            .header(ACCEPT, ACCEPT_BOTH)
            .header(CONTENT_TYPE, "application/json")
            .json(&req)
            .send()
            .await
            .map_err(transport_failure)?;

        let status = resp.status();
        let ct = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let body = resp.text().await.map_err(transport_failure)?;
        debug!(method, status = status.as_u16(), content_type = %ct, "mcp http response");

        if !status.is_success() {
            let body = truncate_chars(&body, MAX_ERROR_BODY_CHARS);
            warn!(method, status = status.as_u16(), "mcp request failed");
            return Err(McpCallError::Transport {
                status: Some(status.as_u16()),
                message: format!("MCP request failed ({}): {body}", status.as_u16()),
                body,
            });
        }

        let raw = if ct.contains("text/event-stream") || sse::looks_like_sse(&body) {
            sse::parse_last_json_message_from_sse(&body)?
        } else if body.trim().is_empty() {
            return Err(McpCallError::Protocol("response was empty".into()));
        } else {
            serde_json::from_str::<Value>(&body)
                .map_err(|e| McpCallError::Protocol(format!("response was not valid JSON: {e}")))?
        };

        Ok(RpcCall {
            raw,
            raw_text: body,
            status: status.as_u16(),
        })
    }

    pub async fn call_tool(
        &self,
        server_url: &Url,
        name: &str,
        arguments: Value,
    ) -> Result<RpcCall, McpCallError> {
        let params = to_params(&ToolCallParams::new(name, arguments))?;
        self.call(server_url, methods::TOOLS_CALL, params).await
    }

    pub async fn read_resource(&self, server_url: &Url, uri: &str) -> Result<RpcCall, McpCallError> {
        let params = to_params(&ResourceReadParams { uri: uri.to_string() })?;
        self.call(server_url, methods::RESOURCES_READ, params).await
    }

    pub async fn list_tools(&self, server_url: &Url) -> Result<RpcCall, McpCallError> {
        self.call(server_url, methods::TOOLS_LIST, serde_json::json!({})).await
    }

    pub async fn list_resources(&self, server_url: &Url) -> Result<RpcCall, McpCallError> {
        self.call(server_url, methods::RESOURCES_LIST, serde_json::json!({})).await
    }
}

/// Fail fast when a required server URL is not configured.
pub fn require_server_url<'a>(url: Option<&'a Url>, var: &str) -> Result<&'a Url, McpCallError> {
    url.ok_or_else(|| McpCallError::Config(format!("{var} is not set")))
}

/// Validate a caller-supplied server URL: non-empty, absolute, http(s).
pub fn parse_server_url(raw: &str) -> Result<Url, McpCallError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(McpCallError::Config("serverUrl is required".into()));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| McpCallError::Config(format!("serverUrl is not an absolute URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(McpCallError::Config(format!("unsupported serverUrl scheme: {other}"))),
    }
}

/// Keep at most `max` characters (not bytes) of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn to_params<T: serde::Serialize>(params: &T) -> Result<Value, McpCallError> {
    serde_json::to_value(params).map_err(|e| McpCallError::Protocol(format!("encode params: {e}")))
}

fn transport_failure(e: reqwest::Error) -> McpCallError {
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else {
        format!("MCP request failed: {e}")
    };
    warn!(error = %e, "mcp transport failure");
    McpCallError::Transport {
        status: e.status().map(|s| s.as_u16()),
        body: String::new(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("äöü", 2), "äö");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars(&"x".repeat(2500), MAX_ERROR_BODY_CHARS).len(), 2000);
    }

    #[test]
    fn server_url_must_be_absolute_http() {
        assert!(parse_server_url("https://example.com/api/mcp").is_ok());
        assert!(matches!(parse_server_url("   "), Err(McpCallError::Config(_))));
        assert!(matches!(parse_server_url("/api/mcp"), Err(McpCallError::Config(_))));
        assert!(matches!(parse_server_url("file:///etc/passwd"), Err(McpCallError::Config(_))));
    }

    #[test]
    fn missing_url_is_config_error() {
        let err = require_server_url(None, "MCP_SERVER_URL").unwrap_err();
        assert_eq!(err, McpCallError::Config("MCP_SERVER_URL is not set".into()));
    }
}
