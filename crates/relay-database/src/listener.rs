//! `LISTEN/NOTIFY` change source backed by the shared pool.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tracing::{debug, warn};

use relay_core::error::{AppError, ErrorKind};
use relay_core::result::AppResult;
use relay_core::traits::{MessageStream, NotificationSource};

/// Opens one dedicated pooled connection per listen registration.
#[derive(Debug, Clone)]
pub struct PgNotificationSource {
    pool: PgPool,
}

impl PgNotificationSource {
    /// Create a source drawing listener connections from `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSource for PgNotificationSource {
    async fn listen(&self, channel: &str) -> AppResult<Box<dyn MessageStream>> {
        let mut listener = PgListener::connect_with(&self.pool).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::BridgeConnection,
                "Failed to acquire listener connection",
                e,
            )
        })?;

        listener.listen(channel).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::BridgeConnection,
                format!("Failed to LISTEN on '{channel}'"),
                e,
            )
        })?;

        debug!(channel = %channel, "Listening for change notifications");

        Ok(Box::new(PgMessageStream {
            listener,
            channel: channel.to_string(),
        }))
    }
}

/// A single `LISTEN` registration.
///
/// Dropping it returns the connection to the pool.
struct PgMessageStream {
    listener: PgListener,
    channel: String,
}

#[async_trait]
impl MessageStream for PgMessageStream {
    async fn recv(&mut self) -> AppResult<String> {
        // `try_recv` reports a lost connection as `None` instead of
        // silently reconnecting.
        match self.listener.try_recv().await {
            Ok(Some(notification)) => Ok(notification.payload().to_string()),
            Ok(None) => Err(AppError::bridge_connection(format!(
                "Listener connection for '{}' was lost",
                self.channel
            ))),
            Err(e) => Err(AppError::with_source(
                ErrorKind::BridgeConnection,
                format!("Listener for '{}' failed", self.channel),
                e,
            )),
        }
    }

    async fn close(self: Box<Self>) {
        let PgMessageStream {
            mut listener,
            channel,
        } = *self;

        if let Err(e) = listener.unlisten(&channel).await {
            warn!(channel = %channel, error = %e, "UNLISTEN failed, dropping connection");
        }
        debug!(channel = %channel, "Listener released");
    }
}
