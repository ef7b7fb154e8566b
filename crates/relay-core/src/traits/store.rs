//! Read access to the originating store.

use async_trait::async_trait;

use crate::events::Event;
use crate::result::AppResult;

/// Looks up the authoritative state behind a notification wake-up.
#[async_trait]
pub trait NotificationStore: Send + Sync + std::fmt::Debug + 'static {
    /// The single most recent notification record for `user_id`.
    async fn latest_for_user(&self, user_id: &str) -> AppResult<Option<Event>>;
}
