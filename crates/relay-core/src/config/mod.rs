//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod broker;
pub mod database;
pub mod logging;
pub mod realtime;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::broker::BrokerConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// External broker settings.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Streaming and bridge settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `RELAY__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("RELAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.database.url.trim().is_empty() {
            return Err(AppError::configuration("database.url must be set"));
        }
        if self.broker.enabled && self.broker.channel.trim().is_empty() {
            return Err(AppError::configuration(
                "broker.channel must be set when the broker is enabled",
            ));
        }
        if self.realtime.keep_alive_seconds == 0 {
            return Err(AppError::configuration(
                "realtime.keep_alive_seconds must be greater than zero",
            ));
        }
        if self.realtime.sink_buffer_size == 0 {
            return Err(AppError::configuration(
                "realtime.sink_buffer_size must be greater than zero",
            ));
        }
        for (name, value) in [
            ("realtime.comment_channel", &self.realtime.comment_channel),
            ("realtime.notification_channel", &self.realtime.notification_channel),
            ("realtime.slug_field", &self.realtime.slug_field),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::configuration(format!("{name} must be set")));
            }
        }
        Ok(())
    }
}
