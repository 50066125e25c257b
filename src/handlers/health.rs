use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::AppState;
use crate::config::mask_url;

/// `GET /health`. Never touches the network.
pub async fn handle(State(st): State<AppState>) -> Json<Value> {
    let cfg = &st.config;
    Json(json!({
        "ok": true,
        "mcpConfigured": cfg.mcp_server_url.is_some(),
        "dashboardConfigured": cfg.dashboard_server_url.is_some(),
        "mcpServer": cfg.mcp_server_url.as_ref().map(mask_url),
    }))
}
