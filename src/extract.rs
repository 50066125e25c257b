//! Normalization of JSON-RPC `result` payloads into text, HTML and
//! structured tool/resource results.
//!
//! Every function here is pure and total: unexpected shapes yield empty
//! output, never an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::JsonRpcResponse;

/// `result.content` when it is an array, else `result.contents`, else nothing.
pub fn content_items(result: &Value) -> &[Value] {
    if let Some(items) = result.get("content").and_then(Value::as_array) {
        return items;
    }
    result
        .get("contents")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Newline-joined `text` of every item carrying a string `text`, in server order.
pub fn extract_text(result: &Value) -> String {
    content_items(result)
        .iter()
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Best-effort HTML for an embedded frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlContent {
    pub html: String,
    pub mime_type: Option<String>,
    pub uri: Option<String>,
}

/// Prefer the first item whose `mimeType` contains `text/html`
/// (case-insensitive) and has string `text`. Otherwise fall back to all
/// text joined, with metadata from the first item. The fallback is not
/// guaranteed to be markup.
pub fn extract_html(result: &Value) -> HtmlContent {
    let items = content_items(result);

    let html_item = items.iter().find(|item| {
        item.get("text").and_then(Value::as_str).is_some()
            && item
                .get("mimeType")
                .and_then(Value::as_str)
                .is_some_and(|m| m.to_ascii_lowercase().contains("text/html"))
    });

    if let Some(item) = html_item {
        return HtmlContent {
            html: item.get("text").and_then(Value::as_str).unwrap_or_default().to_string(),
            mime_type: string_field(item, "mimeType"),
            uri: string_field(item, "uri"),
        };
    }

    let first = items.first();
    HtmlContent {
        html: extract_text(result),
        mime_type: first.and_then(|i| string_field(i, "mimeType")),
        uri: first.and_then(|i| string_field(i, "uri")),
    }
}

/// A single resource content entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContentItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

/// Object items of the content list; non-string fields read as absent.
pub fn extract_contents(result: &Value) -> Vec<ResourceContentItem> {
    content_items(result)
        .iter()
        .filter(|item| item.is_object())
        .map(|item| ResourceContentItem {
            uri: string_field(item, "uri"),
            mime_type: string_field(item, "mimeType"),
            text: string_field(item, "text"),
            blob: string_field(item, "blob"),
        })
        .collect()
}

/// Outcome of a `tools/call`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub text: String,
    pub is_error: bool,
    pub raw: Value,
}

impl ToolResult {
    /// Reads `result` from any JSON document. A body without one (an
    /// error envelope, a bare id echo) yields empty text.
    pub fn from_raw(raw: Value) -> Self {
        let (text, is_error) = match raw.get("result") {
            Some(result) => (
                extract_text(result),
                result.get("isError").and_then(Value::as_bool).unwrap_or(false),
            ),
            None => (String::new(), true),
        };
        Self { text, is_error, raw }
    }

    pub fn from_response(response: JsonRpcResponse) -> Self {
        Self::from_raw(response.to_value())
    }

    pub fn normalized(&self) -> NormalizedToolResult {
        NormalizedToolResult {
            text: self.text.clone(),
            raw: self.raw.clone(),
        }
    }
}

/// Wire shape `{text, raw}` handed back to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedToolResult {
    pub text: String,
    pub raw: Value,
}

/// Outcome of a `resources/read`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceResult {
    pub html: HtmlContent,
    pub contents: Vec<ResourceContentItem>,
    pub raw: Value,
}

impl ResourceResult {
    pub fn from_raw(raw: Value) -> Self {
        let (html, contents) = match raw.get("result") {
            Some(result) => (extract_html(result), extract_contents(result)),
            None => (HtmlContent::default(), Vec::new()),
        };
        Self { html, contents, raw }
    }

    pub fn from_response(response: JsonRpcResponse) -> Self {
        Self::from_raw(response.to_value())
    }
}

/// A tool that ships an embedded app (`_meta.ui.resourceUri`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub resource_uri: String,
}

/// Tools from a `tools/list` result that declare a UI resource.
pub fn find_ui_tools(result: &Value) -> Vec<UiTool> {
    let Some(tools) = result.get("tools").and_then(Value::as_array) else {
        return Vec::new();
    };
    tools
        .iter()
        .filter_map(|tool| {
            let name = string_field(tool, "name").filter(|n| !n.is_empty())?;
            let resource_uri = tool
                .pointer("/_meta/ui/resourceUri")
                .and_then(Value::as_str)
                .filter(|u| !u.is_empty())?
                .to_string();
            Some(UiTool {
                name,
                title: string_field(tool, "title"),
                resource_uri,
            })
        })
        .collect()
}

/// Names advertised by a `tools/list` result.
pub fn tool_names(result: &Value) -> Vec<&str> {
    result
        .get("tools")
        .and_then(Value::as_array)
        .map(|tools| tools.iter().filter_map(|t| t.get("name").and_then(Value::as_str)).collect())
        .unwrap_or_default()
}

fn string_field(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(Value::as_str).map(str::to_string)
}
