//! Health check endpoints.
//!
//! `/health` is a bare liveness probe for orchestrators. `/api/health` also
//! pings the store so dashboards can tell a database outage apart from a dead
//! process; it reports 200 either way.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    /// "connected" or "disconnected"
    pub mongodb: String,
}

/// Liveness probe: the process can answer HTTP.
pub async fn health() -> &'static str {
    "ok"
}

/// Handler for `GET /api/health`
pub async fn api_health(State(state): State<AppState>) -> Json<HealthStatus> {
    let connected = state.store.is_connected().await;
    Json(HealthStatus {
        status: "healthy".to_string(),
        mongodb: if connected { "connected" } else { "disconnected" }.to_string(),
    })
}
