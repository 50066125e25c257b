//! Scripted upstream MCP server on an ephemeral port.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde_json::Value;
use url::Url;

/// One request the mock saw.
#[derive(Debug, Clone)]
pub struct Seen {
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct Script {
    status: StatusCode,
    content_type: &'static str,
    body: String,
    delay: Duration,
    seen: Arc<Mutex<Vec<Seen>>>,
}

pub struct MockUpstream {
    pub url: Url,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockUpstream {
    /// Answer every POST to `/mcp` with the given status, content type and body.
    pub async fn start(status: u16, content_type: &'static str, body: impl Into<String>) -> Self {
        Self::serve(status, content_type, body.into(), Duration::ZERO).await
    }

    /// Like [`MockUpstream::json`], but each answer is held back by `delay`.
    pub async fn slow(delay: Duration, body: Value) -> Self {
        Self::serve(200, "application/json", body.to_string(), delay).await
    }

    async fn serve(status: u16, content_type: &'static str, body: String, delay: Duration) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let script = Script {
            status: StatusCode::from_u16(status).unwrap(),
            content_type,
            body,
            delay,
            seen: seen.clone(),
        };
        let app = Router::new().route("/mcp", post(respond)).with_state(script);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: Url::parse(&format!("http://{addr}/mcp")).unwrap(),
            seen,
        }
    }

    pub async fn json(body: Value) -> Self {
        Self::start(200, "application/json", body.to_string()).await
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn respond(State(script): State<Script>, headers: HeaderMap, body: String) -> Response {
    let header_str = |name| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    script.seen.lock().unwrap().push(Seen {
        accept: header_str(header::ACCEPT),
        content_type: header_str(header::CONTENT_TYPE),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });
    if !script.delay.is_zero() {
        tokio::time::sleep(script.delay).await;
    }
    (script.status, [(header::CONTENT_TYPE, script.content_type)], script.body).into_response()
}
