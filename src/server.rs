use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::client::McpCallError;
use crate::config::{mask_url, HostConfig};
use crate::handlers::{self, AppState};

/// Interval of the rate-limit table sweep.
const SWEEP_EVERY: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("build clients: {0}")]
    Client(#[from] McpCallError),
    #[error("bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
    #[error("serve: {0}")]
    Serve(std::io::Error),
}

/// HTTP host serving the MCP routes and the chat endpoint.
pub struct HostServer {
    state: AppState,
}

impl HostServer {
    pub fn new(config: HostConfig) -> Result<Self, ServerError> {
        Ok(Self { state: AppState::new(config)? })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn app(&self) -> Router {
        handlers::router(self.state.clone()).layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until the process exits.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.state.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        let sweeper = self.state.limiter.clone().spawn_sweeper(SWEEP_EVERY);
        info!(
            %addr,
            mcp_server = self.state.config.mcp_server_url.as_ref().map(mask_url).as_deref().unwrap_or("unset"),
            chat_configured = self.state.chat.is_configured(),
            "mcp host listening"
        );

        let served = axum::serve(listener, self.app()).await.map_err(ServerError::Serve);
        sweeper.abort();
        served
    }
}
