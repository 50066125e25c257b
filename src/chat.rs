//! Chat completion forwarding for the `/chat` route.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::HostError;

/// Byte budget of a chat reply.
pub const MAX_REPLY_BYTES: usize = 10 * 1024;

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Forwarder to an OpenAI-compatible `/chat/completions` API.
///
/// Without an API key every message gets a deterministic placeholder reply.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: Url,
    model: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>, base_url: Url, model: String) -> Self {
        Self { http, api_key, base_url, model }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Reply to one message, trimmed to [`MAX_REPLY_BYTES`].
    pub async fn reply(&self, message: &str) -> Result<String, HostError> {
        let Some(api_key) = &self.api_key else {
            return Ok(trim_to_byte_size(&placeholder_reply(message), MAX_REPLY_BYTES));
        };

        let endpoint = completions_url(&self.base_url);
        let body = CompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: message },
            ],
            temperature: 0.2,
        };

        let resp = self
            .http
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "chat completion request failed");
                upstream_failed(None)
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "chat completion rejected");
            return Err(upstream_failed(Some(status.as_u16())));
        }

        let payload: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| HostError::Protocol(format!("chat completion was not valid JSON: {e}")))?;
        let text = payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_else(|| "No reply.".to_string());

        Ok(trim_to_byte_size(&text, MAX_REPLY_BYTES))
    }
}

pub fn placeholder_reply(message: &str) -> String {
    format!("Placeholder reply (OPENAI_API_KEY is not set). You said: \"{message}\"")
}

fn completions_url(base: &Url) -> String {
    format!("{}/chat/completions", base.as_str().trim_end_matches('/'))
}

fn upstream_failed(status: Option<u16>) -> HostError {
    HostError::Transport {
        status,
        body: String::new(),
        message: "chat completion request failed".into(),
    }
}

/// Drop whole characters from the end until the UTF-8 encoding fits `max_bytes`.
pub fn trim_to_byte_size(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Rate-limit identifier: first `x-forwarded-for` hop, else `x-real-ip`, else `unknown`.
pub fn client_identifier(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
            return first.to_string();
        }
    }
    header("x-real-ip").unwrap_or("unknown").to_string()
}
