use serde_json::Value;

use super::McpCallError;

/// Small SSE decoder for MCP streamable HTTP responses.
///
/// Only `data:` lines matter. Each blank-line-delimited event yields the
/// `data:` lines it carried; comments and other fields are ignored.
pub fn decode_sse_events(buf: &str) -> Vec<Vec<&str>> {
    let mut out = Vec::new();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in buf.split('\n') {
        let l = line.trim_end_matches('\r');

        if l.is_empty() {
            if !data_lines.is_empty() {
                out.push(std::mem::take(&mut data_lines));
            }
            continue;
        }

        // Ignore comments and unknown fields.
        if l.starts_with(':') {
            continue;
        }

        if let Some(rest) = l.strip_prefix("data:") {
            data_lines.push(rest.trim_start());
        }
    }

    if !data_lines.is_empty() {
        out.push(data_lines);
    }

    out
}

/// Whether a body looks like an event stream even without the header.
pub fn looks_like_sse(body: &str) -> bool {
    let head = body.trim_start();
    head.starts_with("data:") || head.starts_with("event:") || head.starts_with("id:")
}

/// Parse every JSON frame of an event stream, in stream order.
///
/// An event's data lines are joined first; when the joined payload is not
/// JSON, each line is tried as its own frame.
pub fn json_frames(body: &str) -> Vec<Value> {
    let mut frames = Vec::new();
    for lines in decode_sse_events(body) {
        let joined = lines.join("\n");
        if let Ok(v) = serde_json::from_str::<Value>(&joined) {
            frames.push(v);
            continue;
        }
        if lines.len() > 1 {
            frames.extend(
                lines
                    .iter()
                    .filter_map(|l| serde_json::from_str::<Value>(l).ok()),
            );
        }
    }
    frames
}

/// Last valid JSON frame wins; earlier frames (progress notifications and
/// the like) are discarded.
pub fn parse_last_json_message_from_sse(body: &str) -> Result<Value, McpCallError> {
    let events = decode_sse_events(body);
    if events.is_empty() {
        return Err(McpCallError::Protocol("response was empty".into()));
    }
    json_frames(body)
        .pop()
        .ok_or_else(|| McpCallError::Protocol("response was not valid JSON".into()))
}
