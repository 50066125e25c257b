use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::protocol::JsonRpcError;

/// What the proxy endpoint answered.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyReply {
    pub status: u16,
    /// Full endpoint body, normally `{raw: ...}`.
    pub body: Value,
}

impl ProxyReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The hop from the bridge to the same-origin proxy endpoint.
///
/// `Err` carries a transport failure message (nothing came back).
#[async_trait]
pub trait BridgeProxy: Send + Sync {
    async fn forward(&self, method: &str, params: Value) -> Result<ProxyReply, String>;
}

#[async_trait]
impl<T: BridgeProxy + ?Sized> BridgeProxy for std::sync::Arc<T> {
    async fn forward(&self, method: &str, params: Value) -> Result<ProxyReply, String> {
        (**self).forward(method, params).await
    }
}

/// Map a proxy outcome onto the frame's JSON-RPC reply.
///
/// - a non-2xx status or transport failure becomes -32603 with whatever
///   diagnostic payload exists;
/// - an `error` object under a 2xx `raw` is forwarded verbatim (missing
///   fields fall back to -32603 / `fallback_message`);
/// - otherwise `raw.result`, or the whole `raw` when there is no wrapper.
pub fn translate_proxy_outcome(
    outcome: Result<ProxyReply, String>,
    fallback_message: &str,
) -> Result<Value, JsonRpcError> {
    let reply = outcome.map_err(JsonRpcError::internal_error)?;
    let raw = reply.body.get("raw").cloned();

    if !reply.is_success() {
        let data = match raw {
            Some(raw) => raw,
            None if reply.body.is_null() => serde_json::json!({ "status": reply.status }),
            None => reply.body,
        };
        return Err(JsonRpcError::internal_error(fallback_message).with_data(data));
    }

    if let Some(error) = raw.as_ref().and_then(|r| r.get("error")).filter(|e| !e.is_null()) {
        return Err(JsonRpcError::from_loose(error, JsonRpcError::INTERNAL_ERROR, fallback_message));
    }

    Ok(match raw {
        Some(Value::Object(mut obj)) if obj.contains_key("result") => {
            obj.remove("result").unwrap_or(Value::Null)
        }
        Some(raw) => raw,
        None => Value::Null,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyRequest<'a> {
    method: &'a str,
    params: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_url: Option<&'a str>,
}

/// Proxy hop over HTTP to the host's own `/app-bridge` endpoint.
#[derive(Debug, Clone)]
pub struct HttpBridgeProxy {
    http: reqwest::Client,
    endpoint: Url,
    server_url: Option<String>,
}

impl HttpBridgeProxy {
    pub fn new(http: reqwest::Client, endpoint: Url) -> Self {
        Self { http, endpoint, server_url: None }
    }

    /// Target a specific MCP server instead of the endpoint's default.
    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = Some(server_url.into());
        self
    }
}

#[async_trait]
impl BridgeProxy for HttpBridgeProxy {
    async fn forward(&self, method: &str, params: Value) -> Result<ProxyReply, String> {
        let body = ProxyRequest {
            method,
            params,
            server_url: self.server_url.as_deref(),
        };
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("proxy request failed: {e}"))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("read proxy response: {e}"))?;

        let body = match serde_json::from_str::<Value>(&text) {
            Ok(v) => v,
            Err(_) if !(200..300).contains(&status) => Value::Null,
            Err(e) => return Err(format!("proxy response was not valid JSON: {e}")),
        };
        Ok(ProxyReply { status, body })
    }
}
