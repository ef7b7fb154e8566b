//! Health check handler.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use relay_realtime::RelayStats;

use crate::state::AppState;

/// Health response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database does not answer.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// `connected`, `unavailable`, or `not_configured`.
    pub database: &'static str,
    /// Relay state and counters.
    pub relay: RelayStats,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.database {
        None => "not_configured",
        Some(db) => match db.health_check().await {
            Ok(true) => "connected",
            _ => "unavailable",
        },
    };

    Json(HealthResponse {
        status: if database == "unavailable" { "degraded" } else { "ok" },
        version: env!("CARGO_PKG_VERSION"),
        database,
        relay: state.relay.stats(),
    })
}
