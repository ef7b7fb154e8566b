//! Topic key definitions and parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

use relay_core::error::AppError;
use relay_core::result::AppResult;

/// Typed subscription scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum TopicKey {
    /// Comment thread of one post, keyed by URL slug.
    Slug(String),
    /// Process-wide comment stream.
    Comments,
    /// Notification stream of one user.
    Notifications(String),
}

impl TopicKey {
    /// Thread topic for `slug`, kept verbatim. Blank slugs are rejected.
    pub fn slug(slug: &str) -> AppResult<Self> {
        if slug.trim().is_empty() {
            return Err(AppError::configuration("A post slug is required"));
        }
        Ok(TopicKey::Slug(slug.to_string()))
    }

    /// Notification topic for `user_id`, kept verbatim. Blank ids are
    /// rejected.
    pub fn notifications(user_id: &str) -> AppResult<Self> {
        if user_id.trim().is_empty() {
            return Err(AppError::configuration("A user_id is required"));
        }
        Ok(TopicKey::Notifications(user_id.to_string()))
    }

    /// Display form, e.g. `post:abc`.
    pub fn to_channel_string(&self) -> String {
        match self {
            TopicKey::Slug(slug) => format!("post:{slug}"),
            TopicKey::Comments => "comments:global".to_string(),
            TopicKey::Notifications(id) => format!("notifications:{id}"),
        }
    }

    /// Whether the topic lives in the slug registry.
    pub fn is_slug_scoped(&self) -> bool {
        matches!(self, TopicKey::Slug(_))
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_channel_string())
    }
}
