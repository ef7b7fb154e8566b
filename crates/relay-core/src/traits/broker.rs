//! External pub/sub broker trait.

use async_trait::async_trait;

use crate::result::AppResult;

use super::source::MessageStream;

/// An external pub/sub broker shared by every relay instance.
#[async_trait]
pub trait Broker: Send + Sync + std::fmt::Debug + 'static {
    /// Publish a payload verbatim to `channel`.
    async fn publish(&self, channel: &str, payload: &str) -> AppResult<()>;

    /// Open a subscriber connection on `channel`.
    async fn subscribe(&self, channel: &str) -> AppResult<Box<dyn MessageStream>>;
}
