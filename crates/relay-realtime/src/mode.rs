//! Broker-backed or local distribution for the global comment stream.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use relay_core::config::BrokerConfig;
use relay_core::traits::Broker;

use crate::bridge::redis_pubsub::RedisBroker;

/// How the global comment stream is distributed. Decided once at startup.
#[derive(Debug, Clone)]
pub enum DistributionMode {
    /// Publishes broadcast directly to this process's global sinks.
    Local,
    /// Publishes go through the broker channel; a bridge feeds global sinks.
    Broker {
        /// Broker client.
        broker: Arc<dyn Broker>,
        /// Channel carrying the global stream.
        channel: String,
    },
}

impl DistributionMode {
    /// Broker mode over an existing client.
    pub fn broker(broker: Arc<dyn Broker>, channel: impl Into<String>) -> Self {
        DistributionMode::Broker {
            broker,
            channel: channel.into(),
        }
    }

    /// Pick the mode from configuration.
    ///
    /// Falls back to local distribution when the broker is disabled or
    /// cannot be reached.
    pub async fn select(config: &BrokerConfig) -> Self {
        if !config.enabled {
            info!("Broker disabled, using local fan-out");
            return DistributionMode::Local;
        }

        match RedisBroker::connect(&config.url).await {
            Ok(broker) => {
                info!(channel = %config.channel, "Using broker-backed fan-out");
                Self::broker(Arc::new(broker), config.channel.clone())
            }
            Err(e) => {
                warn!(error = %e, "Broker unreachable, falling back to local fan-out");
                DistributionMode::Local
            }
        }
    }

    /// Mode name as reported to clients.
    pub fn name(&self) -> &'static str {
        match self {
            DistributionMode::Local => "local",
            DistributionMode::Broker { .. } => "broker",
        }
    }

    /// Whether publishes go through the broker.
    pub fn is_broker(&self) -> bool {
        matches!(self, DistributionMode::Broker { .. })
    }
}

impl fmt::Display for DistributionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
