//! External broker configuration.

use serde::{Deserialize, Serialize};

/// Redis pub/sub broker configuration.
///
/// When disabled, or when the broker is unreachable at startup, the relay
/// falls back to single-instance local fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Whether broker-backed distribution is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Redis connection URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Pub/sub channel carrying the global comment stream.
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_url(),
            channel: default_channel(),
        }
    }
}

fn default_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_channel() -> String {
    "comments".to_string()
}
