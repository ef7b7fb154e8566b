//! Notification repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use relay_core::error::{AppError, ErrorKind};
use relay_core::events::Event;
use relay_core::result::AppResult;
use relay_core::traits::NotificationStore;

/// Most recent notification row for one user, as a JSON object.
const LATEST_FOR_USER: &str = "SELECT to_jsonb(n) FROM notifications n \
     WHERE n.user_id::text = $1 \
     ORDER BY n.created_at DESC LIMIT 1";

/// Repository for notification lookups.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the newest notification for a user.
    pub async fn find_latest(&self, user_id: &str) -> AppResult<Option<serde_json::Value>> {
        sqlx::query_scalar::<_, serde_json::Value>(LATEST_FOR_USER)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to fetch latest notification", e)
            })
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn latest_for_user(&self, user_id: &str) -> AppResult<Option<Event>> {
        self.find_latest(user_id)
            .await?
            .map(Event::from_value)
            .transpose()
    }
}
