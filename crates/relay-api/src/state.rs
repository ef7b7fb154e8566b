//! Application state shared across all handlers.

use std::sync::Arc;

use relay_core::config::AppConfig;
use relay_database::DatabasePool;
use relay_realtime::Relay;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Relay engine
    pub relay: Arc<Relay>,
    /// PostgreSQL pool, reported by the health endpoint when present
    pub database: Option<DatabasePool>,
}

impl AppState {
    /// Bundle the shared dependencies.
    pub fn new(config: Arc<AppConfig>, relay: Arc<Relay>, database: Option<DatabasePool>) -> Self {
        Self {
            config,
            relay,
            database,
        }
    }
}
