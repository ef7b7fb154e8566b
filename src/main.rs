//! Comment relay server
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use relay_api::{AppState, build_app};
use relay_core::config::{AppConfig, LoggingConfig};
use relay_core::error::{AppError, ErrorKind};
use relay_database::DatabasePool;
use relay_realtime::{DistributionMode, Relay};

#[tokio::main]
async fn main() {
    let env = std::env::var("RELAY_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config.logging);
    info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    info!("Starting comment relay v{}", env!("CARGO_PKG_VERSION"));

    let database = DatabasePool::connect(&config.database).await?;
    let mode = DistributionMode::select(&config.broker).await;

    let relay = Arc::new(Relay::new(
        config.realtime.clone(),
        mode,
        Arc::new(database.notification_source()),
        Arc::new(database.notification_repository()),
    ));

    let config = Arc::new(config);
    let state = AppState::new(config.clone(), relay.clone(), Some(database.clone()));
    let app = build_app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Internal, format!("Failed to bind {addr}"), e)
    })?;
    info!(addr = %addr, "Comment relay listening");

    // Streams never end on their own; closing every sink lets in-flight
    // responses finish so the server can drain.
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let shutdown_relay = relay.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            if tokio::time::timeout(grace, shutdown_relay.shutdown())
                .await
                .is_err()
            {
                warn!(grace_seconds = grace.as_secs(), "Relay shutdown timed out");
            }
        })
        .await?;

    database.close().await;
    info!("Comment relay stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
