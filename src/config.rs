use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

/// Default timeout for one outbound JSON-RPC round trip (10 seconds).
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default fixed window of the chat rate limiter (1 second).
const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 1000;

pub const DEFAULT_RESOURCE_ID: &str = "hello_app_panel";
pub const DEFAULT_DASHBOARD_RESOURCE_ID: &str = "ui://dashboard_mcp_hello";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid absolute http(s) URL: {value}")]
    InvalidUrl { name: &'static str, value: String },
    #[error("{name} must be a positive integer")]
    NotPositive { name: &'static str },
    #[error("{name} is not a valid socket address: {value}")]
    InvalidAddr { name: &'static str, value: String },
}

/// Host configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub mcp_server_url: Option<Url>,
    pub resource_id: String,
    pub dashboard_server_url: Option<Url>,
    pub dashboard_resource_id: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Url,
    pub openai_model: String,
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
    pub rate_limit_window: Duration,
}

impl HostConfig {
    /// Load configuration from the process environment.
    ///
    /// - `MCP_SERVER_URL` (optional here, required by every MCP call)
    /// - `MCP_RESOURCE_ID` (optional, default `hello_app_panel`)
    /// - `DASHBOARD_MCP_SERVER_URL` / `DASHBOARD_MCP_RESOURCE_ID` (optional second target)
    /// - `OPENAI_API_KEY` (optional; absent means placeholder chat replies)
    /// - `OPENAI_BASE_URL`, `OPENAI_MODEL` (optional)
    /// - `MCP_HOST_ADDR` (optional, default `127.0.0.1:3000`)
    /// - `MCP_REQUEST_TIMEOUT_SECS` (optional, default 10)
    /// - `RATE_LIMIT_WINDOW_MS` (optional, default 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`HostConfig::from_env`] with an injectable variable source.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mcp_server_url = get("MCP_SERVER_URL")
            .map(|v| parse_http_url("MCP_SERVER_URL", &v))
            .transpose()?;
        let dashboard_server_url = get("DASHBOARD_MCP_SERVER_URL")
            .map(|v| parse_http_url("DASHBOARD_MCP_SERVER_URL", &v))
            .transpose()?;
        let openai_base_url = parse_http_url(
            "OPENAI_BASE_URL",
            &get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        )?;

        let bind_raw = get("MCP_HOST_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse::<SocketAddr>().map_err(|_| ConfigError::InvalidAddr {
            name: "MCP_HOST_ADDR",
            value: bind_raw.clone(),
        })?;

        let timeout_secs = match get("MCP_REQUEST_TIMEOUT_SECS") {
            Some(val) => parse_positive("MCP_REQUEST_TIMEOUT_SECS", &val)?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        let window_ms = match get("RATE_LIMIT_WINDOW_MS") {
            Some(val) => parse_positive("RATE_LIMIT_WINDOW_MS", &val)?,
            None => DEFAULT_RATE_LIMIT_WINDOW_MS,
        };

        Ok(Self {
            mcp_server_url,
            resource_id: get("MCP_RESOURCE_ID").unwrap_or_else(|| DEFAULT_RESOURCE_ID.to_string()),
            dashboard_server_url,
            dashboard_resource_id: get("DASHBOARD_MCP_RESOURCE_ID")
                .unwrap_or_else(|| DEFAULT_DASHBOARD_RESOURCE_ID.to_string()),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            bind_addr,
            request_timeout: Duration::from_secs(timeout_secs),
            rate_limit_window: Duration::from_millis(window_ms),
        })
    }
}

fn parse_http_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl { name, value: value.to_string() };
    let url = Url::parse(value).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}

fn parse_positive(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ConfigError::NotPositive { name }),
    }
}

/// Mask a server URL for display: `https://host/…`.
pub fn mask_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    let tail = if url.path() == "/" && url.query().is_none() { "" } else { "/…" };
    format!("{}://{host}{port}{tail}", url.scheme())
}
