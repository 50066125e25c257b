//! Route-level tests: the router is driven in-process with `oneshot`,
//! upstream MCP servers are scripted on ephemeral ports.

mod common;

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::MockUpstream;
use mcp_host_harness::config::HostConfig;
use mcp_host_harness::handlers::{router, AppState};

fn state(vars: &[(&str, &str)]) -> AppState {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let config = HostConfig::from_lookup(move |name| map.get(name).cloned()).unwrap();
    AppState::new(config).unwrap()
}

fn state_for(upstream: &MockUpstream) -> AppState {
    state(&[("MCP_SERVER_URL", upstream.url.as_str())])
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let retry_after = resp
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, retry_after, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ---------------------------------------------------------------------------
// health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_unconfigured_host() {
    let (status, _, body) = send(router(state(&[])), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"ok": true, "mcpConfigured": false, "dashboardConfigured": false, "mcpServer": null})
    );
}

#[tokio::test]
async fn health_masks_server_url() {
    let st = state(&[("MCP_SERVER_URL", "https://secret.example.com/api/mcp?token=abc")]);
    let (_, _, body) = send(router(st), get("/health")).await;
    assert_eq!(body["mcpConfigured"], true);
    assert_eq!(body["mcpServer"], "https://secret.example.com/…");
}

// ---------------------------------------------------------------------------
// tool-call
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_server_url_is_config_error_without_network() {
    let st = state(&[]);
    let mcp = st.mcp.clone();

    let (status, _, body) = send(router(st), post("/tool-call", json!({"name": "hello_world"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["raw"]["error"]["kind"], "config_error");
    assert_eq!(body["raw"]["error"]["message"], "MCP_SERVER_URL is not set");
    assert_eq!(mcp.requests_sent(), 0);
}

#[tokio::test]
async fn tool_call_requires_name() {
    let upstream = MockUpstream::json(json!({"jsonrpc": "2.0", "id": "x", "result": {}})).await;
    let (status, _, body) = send(router(state_for(&upstream)), post("/tool-call", json!({"arguments": {}}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["raw"]["error"]["kind"], "validation_error");
    assert!(upstream.seen().is_empty());
}

#[tokio::test]
async fn tool_call_returns_text_and_raw() {
    let doc = json!({
        "jsonrpc": "2.0",
        "id": "x",
        "result": {"content": [{"type": "text", "text": "Hello"}, {"type": "text", "text": "World"}]}
    });
    let upstream = MockUpstream::json(doc.clone()).await;

    let (status, _, body) = send(
        router(state_for(&upstream)),
        post("/tool-call", json!({"name": "hello_world", "arguments": {"who": "me"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Hello\nWorld");
    assert_eq!(body["raw"], doc);
    assert_eq!(upstream.seen()[0].body["params"]["arguments"], json!({"who": "me"}));
}

#[tokio::test]
async fn tool_call_without_result_member_is_empty_text() {
    let doc = json!({"jsonrpc": "2.0", "id": 1});
    let upstream = MockUpstream::json(doc.clone()).await;

    let (status, _, body) = send(router(state_for(&upstream)), post("/tool-call", json!({"name": "t"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"text": "", "raw": doc}));
}

#[tokio::test]
async fn tool_call_reads_result_from_bare_json_body() {
    let doc = json!({"result": {"content": [{"type": "text", "text": "bare"}]}});
    let upstream = MockUpstream::json(doc.clone()).await;

    let (status, _, body) = send(router(state_for(&upstream)), post("/tool-call", json!({"name": "t"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "bare");
    assert_eq!(body["raw"], doc);
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let upstream = MockUpstream::start(500, "text/plain", "exploded").await;
    let (status, _, body) = send(router(state_for(&upstream)), post("/tool-call", json!({"name": "t"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["raw"]["error"]["kind"], "transport_error");
    assert_eq!(body["raw"]["error"]["status"], 500);
}

#[tokio::test]
async fn invalid_request_json_is_validation_error() {
    let req = Request::builder()
        .method("POST")
        .uri("/tool-call")
        .body(Body::from("{nope"))
        .unwrap();
    let (status, _, body) = send(router(state(&[])), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["raw"]["error"]["kind"], "validation_error");
}

// ---------------------------------------------------------------------------
// tools listing
// ---------------------------------------------------------------------------

fn tool_listing() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": "x",
        "result": {"tools": [
            {"name": "plain"},
            {"name": "panel", "title": "Panel", "_meta": {"ui": {"resourceUri": "ui://panel"}}}
        ]}
    })
}

#[tokio::test]
async fn tools_list_passes_raw_through() {
    let upstream = MockUpstream::json(tool_listing()).await;
    let (status, _, body) = send(router(state_for(&upstream)), get("/tools-list")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["raw"], tool_listing());
    assert_eq!(upstream.seen()[0].body["method"], "tools/list");
}

#[tokio::test]
async fn ui_tools_lists_only_tools_with_resource() {
    let upstream = MockUpstream::json(tool_listing()).await;
    let (_, _, body) = send(router(state_for(&upstream)), get("/ui-tools")).await;
    assert_eq!(
        body,
        json!({"tools": [{"name": "panel", "title": "Panel", "resourceUri": "ui://panel"}]})
    );
}

#[tokio::test]
async fn hello_is_not_found_when_tool_missing() {
    let upstream = MockUpstream::json(tool_listing()).await;
    let (status, _, body) = send(router(state_for(&upstream)), post("/hello", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Tool hello_world not found.");
}

// ---------------------------------------------------------------------------
// resources
// ---------------------------------------------------------------------------

fn html_resource() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": "r",
        "result": {"contents": [{"uri": "ui://hello", "mimeType": "text/html", "text": "<b>hi</b>"}]}
    })
}

#[tokio::test]
async fn read_resource_requires_uri() {
    let upstream = MockUpstream::json(html_resource()).await;
    let (status, _, body) = send(router(state_for(&upstream)), post("/read-resource", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["raw"]["error"]["kind"], "validation_error");
    assert!(upstream.seen().is_empty());
}

#[tokio::test]
async fn read_resource_returns_html_and_contents() {
    let upstream = MockUpstream::json(html_resource()).await;
    let (status, _, body) =
        send(router(state_for(&upstream)), post("/read-resource", json!({"uri": "ui://hello"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["html"], "<b>hi</b>");
    assert_eq!(body["contents"][0]["mimeType"], "text/html");
    assert_eq!(body["raw"], html_resource());
}

#[tokio::test]
async fn read_resource_without_result_member_is_empty() {
    let doc = json!({"jsonrpc": "2.0", "id": 1});
    let upstream = MockUpstream::json(doc.clone()).await;
    let (status, _, body) =
        send(router(state_for(&upstream)), post("/read-resource", json!({"uri": "ui://hello"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"html": "", "contents": [], "raw": doc}));
}

#[tokio::test]
async fn resource_reads_default_id() {
    let upstream = MockUpstream::json(html_resource()).await;
    let (status, _, body) = send(router(state_for(&upstream)), get("/resource")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mimeType"], "text/html");
    assert_eq!(body["uri"], "ui://hello");
    assert_eq!(upstream.seen()[0].body["params"], json!({"uri": "hello_app_panel"}));
}

#[tokio::test]
async fn preview_embeds_resource_in_sandboxed_frame() {
    let upstream = MockUpstream::json(html_resource()).await;
    let resp = router(state_for(&upstream)).oneshot(get("/preview")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains(r#"srcdoc="&lt;b&gt;hi&lt;/b&gt;""#));
    assert!(page.contains(r#"sandbox="allow-scripts allow-forms allow-modals allow-popups""#));

    assert!(page.contains("<script>"));
    assert!(page.contains(r#"window.addEventListener("message", onMessage)"#));
    assert!(page.contains(r#"var endpoint = "/app-bridge";"#));
    assert!(page.contains(r#"req.method === "ui/initialize""#));
}

// ---------------------------------------------------------------------------
// dashboard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dashboard_without_target_is_config_error() {
    let (status, _, body) = send(router(state(&[])), post("/dashboard/hello", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["raw"]["error"]["message"], "DASHBOARD_MCP_SERVER_URL is not set");
}

#[tokio::test]
async fn dashboard_server_url_overrides_config() {
    let upstream = MockUpstream::json(json!({
        "jsonrpc": "2.0", "id": "d", "result": {"content": [{"type": "text", "text": "dash"}]}
    }))
    .await;

    let (status, _, body) = send(
        router(state(&[])),
        post("/dashboard/hello", json!({"serverUrl": upstream.url.as_str()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "dash");
    assert_eq!(upstream.seen()[0].body["params"]["name"], "dashboard_mcp_hello");
}

#[tokio::test]
async fn dashboard_hello_without_result_member_is_empty_text() {
    let doc = json!({"jsonrpc": "2.0", "id": 1});
    let upstream = MockUpstream::json(doc.clone()).await;
    let (status, _, body) = send(
        router(state(&[])),
        post("/dashboard/hello", json!({"serverUrl": upstream.url.as_str()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"text": "", "raw": doc}));
}

// ---------------------------------------------------------------------------
// app-bridge
// ---------------------------------------------------------------------------

#[tokio::test]
async fn app_bridge_requires_method() {
    let (status, _, body) = send(router(state(&[])), post("/app-bridge", json!({"params": {}}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"raw": {"error": {"code": -32600, "message": "method is required"}}}));
}

#[tokio::test]
async fn app_bridge_passes_upstream_error_through() {
    let doc = json!({"jsonrpc": "2.0", "id": "x", "error": {"code": -32001, "message": "tool exploded"}});
    let upstream = MockUpstream::json(doc.clone()).await;

    let (status, _, body) = send(
        router(state_for(&upstream)),
        post("/app-bridge", json!({"method": "tools/call", "params": {"name": "boom"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["raw"], doc);
    assert_eq!(upstream.seen()[0].body["method"], "tools/call");
}

#[tokio::test]
async fn app_bridge_failure_is_server_error_code() {
    let (status, _, body) =
        send(router(state(&[])), post("/app-bridge", json!({"method": "tools/call"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["raw"]["error"]["code"], -32000);
    assert_eq!(body["raw"]["error"]["message"], "MCP_SERVER_URL is not set");
}

// ---------------------------------------------------------------------------
// chat
// ---------------------------------------------------------------------------

fn chat(from: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("x-forwarded-for", from)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn chat_without_key_replies_with_placeholder() {
    let (status, _, body) = send(router(state(&[])), chat("10.0.0.1", json!({"message": "  hi  "}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["reply"],
        "Placeholder reply (OPENAI_API_KEY is not set). You said: \"hi\""
    );
}

#[tokio::test]
async fn chat_is_rate_limited_per_client() {
    let app = router(state(&[]));

    let (first, _, _) = send(app.clone(), chat("10.0.0.2", json!({"message": "a"}))).await;
    assert_eq!(first, StatusCode::OK);

    let (status, retry_after, body) = send(app.clone(), chat("10.0.0.2", json!({"message": "b"}))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(retry_after.as_deref(), Some("1"));
    assert!(body["retryAfterMs"].as_u64().unwrap() > 0);
    assert!(body["error"].is_string());

    let (other, _, _) = send(app, chat("10.0.0.3", json!({"message": "c"}))).await;
    assert_eq!(other, StatusCode::OK);
}

#[tokio::test]
async fn chat_rejects_invalid_bodies() {
    let app = router(state(&[]));

    let bad_json = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("x-forwarded-for", "10.0.0.4")
        .body(Body::from("{"))
        .unwrap();
    let (status, _, body) = send(app.clone(), bad_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON.");

    let (status, _, body) = send(app, chat("10.0.0.5", json!({"message": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request.");
}
