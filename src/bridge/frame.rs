//! Rendering of resource HTML into a sandboxed frame.
//!
//! The HTML goes in through `srcdoc`, never a URL, so the frame gets no
//! origin of its own beyond what the sandbox tokens allow.

use super::{FrameId, HostInfo, UiInitializeResult};

const DEFAULT_TOKENS: [&str; 4] = ["allow-scripts", "allow-forms", "allow-modals", "allow-popups"];
const SAME_ORIGIN: &str = "allow-same-origin";

/// Sandbox token set of an embedded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPolicy {
    tokens: Vec<&'static str>,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self { tokens: DEFAULT_TOKENS.to_vec() }
    }
}

impl SandboxPolicy {
    /// Adds `allow-same-origin`. Debugging only.
    pub fn relaxed_for_debugging(mut self) -> Self {
        if !self.tokens.contains(&SAME_ORIGIN) {
            self.tokens.push(SAME_ORIGIN);
        }
        self
    }

    pub fn allows_same_origin(&self) -> bool {
        self.tokens.contains(&SAME_ORIGIN)
    }

    pub fn attribute(&self) -> String {
        self.tokens.join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct FrameDocument {
    pub frame: FrameId,
    pub html: String,
    pub title: String,
    pub sandbox: SandboxPolicy,
    /// Same-origin proxy endpoint the page's bridge script posts to.
    /// `None` renders a static page with no bridge.
    pub proxy_endpoint: Option<String>,
}

impl FrameDocument {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            frame: FrameId::new(),
            html: html.into(),
            title: "MCP App Preview".into(),
            sandbox: SandboxPolicy::default(),
            proxy_endpoint: None,
        }
    }

    /// Answer the frame's JSON-RPC requests from the host page, proxying
    /// `tools/call` and `resources/read` through `endpoint`.
    pub fn with_bridge(mut self, endpoint: impl Into<String>) -> Self {
        self.proxy_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn render(&self) -> String {
        format!(
            r#"<iframe id="mcp-app-{frame}" title="{title}" sandbox="{sandbox}" referrerpolicy="no-referrer" srcdoc="{srcdoc}"></iframe>"#,
            frame = self.frame,
            title = escape_attr(&self.title),
            sandbox = self.sandbox.attribute(),
            srcdoc = escape_attr(&self.html),
        )
    }

    /// Standalone host page wrapping the frame, plus the bridge script
    /// when a proxy endpoint is set.
    pub fn render_page(&self, heading: &str) -> String {
        format!(
            "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{t}</title></head>\n<body>\n<h1>{h}</h1>\n<div class=\"app-preview\">{frame}</div>\n{script}</body>\n</html>\n",
            t = escape_attr(&self.title),
            h = escape_attr(heading),
            frame = self.render(),
            script = self.bridge_script(),
        )
    }

    fn bridge_script(&self) -> String {
        let Some(endpoint) = &self.proxy_endpoint else {
            return String::new();
        };
        let initialize = serde_json::to_value(UiInitializeResult::for_host(HostInfo::default()))
            .unwrap_or(serde_json::Value::Null);
        let script = BRIDGE_SCRIPT
            .replace("__FRAME_ID__", &js_literal(&serde_json::Value::String(format!("mcp-app-{}", self.frame))))
            .replace("__ENDPOINT__", &js_literal(&serde_json::Value::String(endpoint.clone())))
            .replace("__INITIALIZE__", &js_literal(&initialize));
        format!("<script>\n{script}</script>\n")
    }
}

/// JSON text safe to inline in a `<script>` element.
fn js_literal(value: &serde_json::Value) -> String {
    value.to_string().replace('<', "\\u003c")
}

/// Host-side listener for one frame. Mirrors [`super::AppBridge`]: only
/// messages from the frame's own window count, `ui/initialize` is answered
/// locally, other `ui/*` methods are one-way, and tool/resource calls go
/// through the proxy endpoint. Replies carry the request id unchanged.
const BRIDGE_SCRIPT: &str = r#"(function () {
  var frame = document.getElementById(__FRAME_ID__);
  var endpoint = __ENDPOINT__;
  var initialize = __INITIALIZE__;

  function respond(id, body) {
    if (id === undefined || id === null || !frame.contentWindow) return;
    body.jsonrpc = "2.0";
    body.id = id;
    frame.contentWindow.postMessage(body, "*");
  }

  function parse(data) {
    if (typeof data === "string") {
      try { data = JSON.parse(data); } catch (e) { return null; }
    }
    if (!data || typeof data !== "object" || Array.isArray(data)) return null;
    if (data.jsonrpc !== "2.0" || typeof data.method !== "string") return null;
    return data;
  }

  function proxy(id, method, params, fallback) {
    fetch(endpoint, {
      method: "POST",
      headers: { "content-type": "application/json" },
      body: JSON.stringify({ method: method, params: params })
    }).then(function (resp) {
      return resp.json().catch(function () { return null; }).then(function (body) {
        var raw = body && body.raw;
        if (!resp.ok) {
          respond(id, { error: { code: -32603, message: fallback, data: raw !== undefined && raw !== null ? raw : { status: resp.status } } });
          return;
        }
        if (raw && raw.error) {
          var e = raw.error;
          respond(id, { error: {
            code: typeof e.code === "number" ? e.code : -32603,
            message: typeof e.message === "string" ? e.message : fallback,
            data: e.data
          } });
          return;
        }
        var result = raw && typeof raw === "object" && "result" in raw ? raw.result : (raw === undefined ? null : raw);
        respond(id, { result: result });
      });
    }).catch(function (err) {
      respond(id, { error: { code: -32603, message: String(err && err.message || err) } });
    });
  }

  function onMessage(event) {
    if (!frame || event.source !== frame.contentWindow) return;
    var req = parse(event.data);
    if (!req) return;
    var params = req.params && typeof req.params === "object" && !Array.isArray(req.params) ? req.params : {};

    if (req.method === "ui/initialize") {
      respond(req.id, { result: initialize });
    } else if (req.method.indexOf("ui/") === 0) {
      console.debug("mcp app", req.method, params);
    } else if (req.method === "tools/call") {
      if (typeof params.name !== "string" || params.name === "") {
        respond(req.id, { error: { code: -32602, message: "Invalid params: tool name is required." } });
        return;
      }
      var args = params.arguments && typeof params.arguments === "object" && !Array.isArray(params.arguments) ? params.arguments : {};
      proxy(req.id, "tools/call", { name: params.name, arguments: args }, "Tool call failed.");
    } else if (req.method === "resources/read") {
      if (typeof params.uri !== "string" || params.uri === "") {
        respond(req.id, { error: { code: -32602, message: "Invalid params: resource uri is required." } });
        return;
      }
      proxy(req.id, "resources/read", { uri: params.uri }, "Resource read failed.");
    } else {
      respond(req.id, { error: { code: -32601, message: "Method not found: " + req.method } });
    }
  }

  window.addEventListener("message", onMessage);
  window.addEventListener("pagehide", function () {
    window.removeEventListener("message", onMessage);
  });
})();
"#;

/// Escape text for a double-quoted HTML attribute.
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sandbox_never_grants_same_origin() {
        let policy = SandboxPolicy::default();
        assert!(!policy.allows_same_origin());
        assert_eq!(policy.attribute(), "allow-scripts allow-forms allow-modals allow-popups");
        assert!(policy.relaxed_for_debugging().allows_same_origin());
    }

    #[test]
    fn html_is_injected_as_escaped_srcdoc() {
        let doc = FrameDocument::new(r#"<p class="x">a & b</p>"#);
        let out = doc.render();
        assert!(out.contains(r#"srcdoc="&lt;p class=&quot;x&quot;&gt;a &amp; b&lt;/p&gt;""#));
        assert!(out.contains(r#"referrerpolicy="no-referrer""#));
        assert!(!out.contains(" src=\""));
    }

    #[test]
    fn static_page_has_no_bridge_script() {
        let page = FrameDocument::new("<p>x</p>").render_page("x");
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn bridged_page_listens_for_its_own_frame() {
        let doc = FrameDocument::new("<p>x</p>").with_bridge("/app-bridge");
        let page = doc.render_page("x");
        assert!(page.contains("<script>"));
        assert!(page.contains(&format!(r#"document.getElementById("mcp-app-{}")"#, doc.frame)));
        assert!(page.contains(r#"var endpoint = "/app-bridge";"#));
        assert!(page.contains("event.source !== frame.contentWindow"));
        assert!(page.contains(r#""protocolVersion":"0.1.0""#));
        assert!(!page.contains("__ENDPOINT__"));
    }

    #[test]
    fn inlined_values_cannot_close_the_script() {
        let doc = FrameDocument::new("x").with_bridge("/a</script><b>");
        let page = doc.render_page("x");
        assert!(page.contains(r#""/a\u003c/script>\u003cb>""#));
        assert_eq!(page.matches("</script>").count(), 1);
    }
}
