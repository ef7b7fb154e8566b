//! Redis pub/sub broker for multi-instance deployments.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use redis::aio::ConnectionManager;
use redis::{Client, Msg};
use tracing::{debug, info};

use relay_core::error::{AppError, ErrorKind};
use relay_core::result::AppResult;
use relay_core::traits::{Broker, MessageStream};

/// Redis broker: a managed connection for `PUBLISH`, plus one dedicated
/// connection per subscription.
#[derive(Clone)]
pub struct RedisBroker {
    client: Client,
    conn: ConnectionManager,
    url: String,
}

impl std::fmt::Debug for RedisBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBroker")
            .field("url", &mask_redis_url(&self.url))
            .finish()
    }
}

impl RedisBroker {
    /// Connect to Redis and verify the server answers `PING`.
    pub async fn connect(url: &str) -> AppResult<Self> {
        info!(url = %mask_redis_url(url), "Connecting to Redis broker");

        let client = Client::open(url).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Invalid Redis URL", e)
        })?;

        // Probe once without retries so an unreachable broker fails fast.
        let mut probe = client.get_multiplexed_async_connection().await.map_err(|e| {
            AppError::with_source(ErrorKind::Broker, "Failed to connect to Redis", e)
        })?;
        redis::cmd("PING")
            .query_async::<String>(&mut probe)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Broker, "Redis PING failed", e))?;

        let conn = ConnectionManager::new(client.clone()).await.map_err(|e| {
            AppError::with_source(ErrorKind::Broker, "Failed to connect to Redis", e)
        })?;

        let broker = Self {
            client,
            conn,
            url: url.to_string(),
        };

        info!("Connected to Redis broker");
        Ok(broker)
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn publish(&self, channel: &str, payload: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let receivers = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Broker, "Redis PUBLISH failed", e))?;

        debug!(channel = %channel, receivers, "Published to broker");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> AppResult<Box<dyn MessageStream>> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::BridgeConnection,
                "Failed to open Redis subscriber connection",
                e,
            )
        })?;

        pubsub.subscribe(channel).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::BridgeConnection,
                format!("Redis SUBSCRIBE to '{channel}' failed"),
                e,
            )
        })?;

        Ok(Box::new(RedisMessageStream {
            channel: channel.to_string(),
            messages: Box::pin(pubsub.into_on_message()),
        }))
    }
}

/// One subscriber connection. Dropping it closes the connection.
struct RedisMessageStream {
    channel: String,
    messages: Pin<Box<dyn Stream<Item = Msg> + Send>>,
}

#[async_trait]
impl MessageStream for RedisMessageStream {
    async fn recv(&mut self) -> AppResult<String> {
        match self.messages.next().await {
            Some(msg) => msg.get_payload::<String>().map_err(|e| {
                AppError::with_source(ErrorKind::Decode, "Broker message is not text", e)
            }),
            None => Err(AppError::bridge_connection(format!(
                "Redis subscription to '{}' closed",
                self.channel
            ))),
        }
    }

    async fn close(self: Box<Self>) {
        debug!(channel = %self.channel, "Closing Redis subscription");
    }
}

/// Mask password in Redis URL for safe logging.
fn mask_redis_url(url: &str) -> String {
    let Some(at_pos) = url.find('@') else {
        return url.to_string();
    };
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    match url[..at_pos].rfind(':') {
        Some(colon_pos) if colon_pos > scheme_end => {
            format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..])
        }
        _ => url.to_string(),
    }
}
