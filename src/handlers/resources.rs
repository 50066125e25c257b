use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde_json::json;
use url::Url;

use super::app_bridge::BRIDGE_ENDPOINT;
use super::{json_response, parse_body, raw_error, required_str, AppState};
use crate::bridge::frame::{escape_attr, FrameDocument};
use crate::client::McpClient;
use crate::error::HostError;
use crate::extract::ResourceResult;

/// `POST /read-resource {uri}` → `{html, contents, raw}`.
pub async fn read_resource(State(st): State<AppState>, body: String) -> Response {
    let outcome = async {
        let body = parse_body(&body)?;
        let uri = required_str(&body, "uri", "Resource uri is required")?;
        let url = st.mcp_server_url()?;
        read(&st.mcp, url, uri).await
    }
    .await;

    match outcome {
        Ok(resource) => json_response(
            StatusCode::OK,
            json!({ "html": resource.html.html, "contents": resource.contents, "raw": resource.raw }),
        ),
        Err(err) => raw_error(&err),
    }
}

/// `GET /resource` → `{html, mimeType, uri, raw}` for `MCP_RESOURCE_ID`.
pub async fn resource(State(st): State<AppState>) -> Response {
    let outcome = async {
        let url = st.mcp_server_url()?;
        read(&st.mcp, url, &st.config.resource_id).await
    }
    .await;

    match outcome {
        Ok(resource) => html_payload(resource),
        Err(err) => raw_error(&err),
    }
}

/// `GET /resources-list` → `{raw}`.
pub async fn resources_list(State(st): State<AppState>) -> Response {
    let outcome = async {
        let url = st.mcp_server_url()?;
        Ok::<_, HostError>(st.mcp.list_resources(url).await?)
    }
    .await;
    match outcome {
        Ok(call) => json_response(StatusCode::OK, json!({ "raw": call.raw })),
        Err(err) => raw_error(&err),
    }
}

/// `GET /preview`: the configured resource inside a sandboxed frame.
pub async fn preview(State(st): State<AppState>) -> Response {
    let outcome = async {
        let url = st.mcp_server_url()?;
        read(&st.mcp, url, &st.config.resource_id).await
    }
    .await;

    match outcome {
        Ok(resource) => {
            let heading = resource.html.uri.unwrap_or_else(|| st.config.resource_id.clone());
            let doc = FrameDocument::new(resource.html.html)
                .with_title(format!("MCP App Preview: {heading}"))
                .with_bridge(BRIDGE_ENDPOINT);
            Html(doc.render_page(&heading)).into_response()
        }
        Err(err) => {
            super::log_failure(&err);
            let page = format!(
                "<!doctype html>\n<html><body><h1>Preview unavailable</h1><pre>{}</pre></body></html>\n",
                escape_attr(&err.to_string())
            );
            (
                err.status_code(),
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                page,
            )
                .into_response()
        }
    }
}

/// `resources/read` of `uri`, normalized, keeping the unmodified upstream document.
pub(crate) async fn read(
    mcp: &McpClient,
    server_url: &Url,
    uri: &str,
) -> Result<ResourceResult, HostError> {
    let call = mcp.read_resource(server_url, uri).await?;
    Ok(ResourceResult::from_raw(call.raw))
}

/// `{html, mimeType, uri, raw}`.
pub(crate) fn html_payload(resource: ResourceResult) -> Response {
    json_response(
        StatusCode::OK,
        json!({
            "html": resource.html.html,
            "mimeType": resource.html.mime_type,
            "uri": resource.html.uri,
            "raw": resource.raw,
        }),
    )
}
