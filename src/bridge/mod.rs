//! Host side of the embedded-app bridge.
//!
//! A sandboxed frame speaks JSON-RPC 2.0 over the host page's message
//! channel. One [`AppBridge`] is bound to exactly one frame at construction
//! and answers only that frame: `ui/initialize` locally, `ui/*` as one-way
//! notifications, and `tools/call` / `resources/read` through a
//! [`BridgeProxy`] hop to the same-origin proxy endpoint. The frame itself
//! never reaches the remote server.

pub mod frame;
pub mod proxy;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::protocol::{methods, JsonRpcError, JsonRpcResponse, RpcId};

pub use proxy::{translate_proxy_outcome, BridgeProxy, HttpBridgeProxy, ProxyReply};

pub const BRIDGE_PROTOCOL_VERSION: &str = "0.1.0";

/// Identity of one rendered frame (its window reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(Uuid);

impl FrameId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FrameId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// One message observed on the host page's channel.
///
/// `data` is either a JSON object or a string holding JSON.
#[derive(Debug, Clone)]
pub struct FrameMessage {
    pub source: FrameId,
    pub data: Value,
}

/// A frame-originated request as the bridge understands it.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRequest {
    pub id: Option<RpcId>,
    pub method: String,
    /// Always an object; non-object params read as `{}`.
    pub params: Map<String, Value>,
}

/// A request together with where and whether to answer it.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeEnvelope {
    pub request: BridgeRequest,
    pub reply_to: FrameId,
    pub expects_reply: bool,
}

impl BridgeEnvelope {
    /// `None` unless the payload is a JSON-RPC 2.0 request object with a
    /// string `method`; the channel may carry unrelated traffic.
    pub fn parse(message: &FrameMessage) -> Option<Self> {
        let parsed;
        let payload = match &message.data {
            Value::String(s) => {
                parsed = serde_json::from_str::<Value>(s).ok()?;
                &parsed
            }
            other => other,
        };

        let obj = payload.as_object()?;
        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return None;
        }
        let method = obj.get("method").and_then(Value::as_str)?.to_string();
        let id = obj.get("id").and_then(RpcId::from_value);
        let params = obj
            .get("params")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Some(Self {
            expects_reply: id.is_some(),
            request: BridgeRequest { id, method, params },
            reply_to: message.source,
        })
    }
}

/// A response addressed to one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeReply {
    pub target: FrameId,
    pub message: JsonRpcResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostInfo {
    pub name: String,
    pub version: String,
}

impl Default for HostInfo {
    fn default() -> Self {
        Self {
            name: "MCP Host".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Host -> frame: answer to `ui/initialize`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiInitializeResult {
    pub protocol_version: String,
    pub host_info: HostInfo,
    pub capabilities: Value,
}

impl UiInitializeResult {
    pub fn for_host(host_info: HostInfo) -> Self {
        Self {
            protocol_version: BRIDGE_PROTOCOL_VERSION.into(),
            host_info,
            capabilities: serde_json::json!({
                "tools": { "call": true },
                "resources": { "read": true },
                "ui": { "notify": true }
            }),
        }
    }
}

/// Bridge bound to a single frame.
pub struct AppBridge<P> {
    frame: FrameId,
    proxy: P,
    host_info: HostInfo,
}

impl<P: BridgeProxy> AppBridge<P> {
    pub fn new(frame: FrameId, proxy: P) -> Self {
        Self {
            frame,
            proxy,
            host_info: HostInfo::default(),
        }
    }

    pub fn with_host_info(mut self, host_info: HostInfo) -> Self {
        self.host_info = host_info;
        self
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Handle one channel message. Returns the reply to post back, if any.
    pub async fn handle_message(&self, message: &FrameMessage) -> Option<BridgeReply> {
        if message.source != self.frame {
            return None;
        }
        let envelope = BridgeEnvelope::parse(message)?;
        let outcome = self.dispatch(&envelope.request).await?;

        if !envelope.expects_reply {
            return None;
        }
        let id = envelope.request.id.clone();
        Some(BridgeReply {
            target: envelope.reply_to,
            message: match outcome {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(error) => JsonRpcResponse::error(id, error),
            },
        })
    }

    /// `None` means the method is one-way and never answered.
    async fn dispatch(&self, req: &BridgeRequest) -> Option<Result<Value, JsonRpcError>> {
        match req.method.as_str() {
            methods::UI_INITIALIZE => Some(Ok(serde_json::to_value(UiInitializeResult::for_host(
                self.host_info.clone(),
            ))
            .unwrap_or(Value::Null))),

            methods::UI_NOTIFY => {
                let params = Value::Object(req.params.clone());
                debug!(frame = %self.frame, params = %params, "ui/notify");
                None
            }

            m if m.starts_with(methods::UI_PREFIX) => {
                debug!(frame = %self.frame, method = m, "unsupported ui method");
                None
            }

            methods::TOOLS_CALL => Some(self.tool_call(&req.params).await),

            methods::RESOURCES_READ => Some(self.resource_read(&req.params).await),

            other => Some(Err(JsonRpcError::method_not_found(other))),
        }
    }

    async fn tool_call(&self, params: &Map<String, Value>) -> Result<Value, JsonRpcError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| JsonRpcError::invalid_params("Invalid params: tool name is required."))?;
        let arguments = params
            .get("arguments")
            .filter(|a| a.is_object())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let forwarded = serde_json::json!({ "name": name, "arguments": arguments });
        let outcome = self.proxy.forward(methods::TOOLS_CALL, forwarded).await;
        translate_proxy_outcome(outcome, "Tool call failed.")
    }

    async fn resource_read(&self, params: &Map<String, Value>) -> Result<Value, JsonRpcError> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| JsonRpcError::invalid_params("Invalid params: resource uri is required."))?;

        let forwarded = serde_json::json!({ "uri": uri });
        let outcome = self.proxy.forward(methods::RESOURCES_READ, forwarded).await;
        translate_proxy_outcome(outcome, "Resource read failed.")
    }
}

impl<P: BridgeProxy + 'static> AppBridge<P> {
    /// Start listening on the host channel (frame mounted).
    ///
    /// The listener lives until [`BridgeHandle::detach`] is called, the
    /// handle is dropped, the channel closes, or the reply sink goes away.
    pub fn attach(
        self,
        mut inbound: broadcast::Receiver<FrameMessage>,
        replies: mpsc::UnboundedSender<BridgeReply>,
    ) -> BridgeHandle {
        let frame = self.frame;
        let task = tokio::spawn(async move {
            loop {
                let message = match inbound.recv().await {
                    Ok(m) => m,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(frame = %frame, skipped, "bridge lagged behind host channel");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if let Some(reply) = self.handle_message(&message).await {
                    if replies.send(reply).is_err() {
                        break;
                    }
                }
            }
            debug!(frame = %frame, "bridge listener stopped");
        });
        BridgeHandle { frame, task: Some(task) }
    }
}

/// Mount handle of an attached bridge. Dropping it detaches the listener.
pub struct BridgeHandle {
    frame: FrameId,
    task: Option<JoinHandle<()>>,
}

impl BridgeHandle {
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn is_attached(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Tear the listener down (frame unmounted or replaced).
    pub async fn detach(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
