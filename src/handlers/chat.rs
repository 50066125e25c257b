use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use super::{log_failure, AppState};
use crate::chat::client_identifier;
use crate::error::HostError;
use crate::schema::validate_chat_request;

/// `POST /chat {message}` → `{reply}`.
///
/// The rate limit is checked before the body is read.
pub async fn handle(State(st): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let client = client_identifier(&headers);
    let decision = st.limiter.check(&client);
    if !decision.allowed {
        tracing::info!(
            client = %client,
            retry_after_ms = decision.retry_after.as_millis() as u64,
            "chat rate limited"
        );
        let err = HostError::RateLimited { retry_after: decision.retry_after };
        let retry_after = HeaderValue::from(decision.retry_after_secs());
        return (
            err.status_code(),
            [(header::RETRY_AFTER, retry_after)],
            Json(json!({
                "error": err.to_string(),
                "retryAfterMs": decision.retry_after.as_millis() as u64,
            })),
        )
            .into_response();
    }

    let Ok(parsed) = serde_json::from_str::<Value>(&body) else {
        return chat_error(StatusCode::BAD_REQUEST, "Invalid JSON.");
    };
    let message = match validate_chat_request(&parsed) {
        Ok(m) => m,
        Err(e) => {
            tracing::info!(client = %client, error = %e, "chat request rejected");
            return chat_error(StatusCode::BAD_REQUEST, "Invalid request.");
        }
    };

    match st.chat.reply(&message).await {
        Ok(reply) => Json(json!({ "reply": reply })).into_response(),
        Err(err) => {
            log_failure(&err);
            chat_error(StatusCode::BAD_GATEWAY, "Chat completion request failed.")
        }
    }
}

fn chat_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
