//! Streaming and bridge configuration.

use serde::{Deserialize, Serialize};

/// Streaming sink and change-bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Interval between keep-alive comment frames, in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u64,
    /// Outbound frame queue capacity per sink.
    #[serde(default = "default_sink_buffer")]
    pub sink_buffer_size: usize,
    /// Database notification channel carrying comment changes.
    #[serde(default = "default_comment_channel")]
    pub comment_channel: String,
    /// Database notification channel waking per-user notification streams.
    #[serde(default = "default_notification_channel")]
    pub notification_channel: String,
    /// Event field correlating a comment change with its post slug.
    #[serde(default = "default_slug_field")]
    pub slug_field: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            keep_alive_seconds: default_keep_alive(),
            sink_buffer_size: default_sink_buffer(),
            comment_channel: default_comment_channel(),
            notification_channel: default_notification_channel(),
            slug_field: default_slug_field(),
        }
    }
}

fn default_keep_alive() -> u64 {
    30
}

fn default_sink_buffer() -> usize {
    256
}

fn default_comment_channel() -> String {
    "comment_changes".to_string()
}

fn default_notification_channel() -> String {
    "notification_changes".to_string()
}

fn default_slug_field() -> String {
    "post_id".to_string()
}
