//! Change-notification source traits.

use async_trait::async_trait;

use crate::result::AppResult;

/// One live listen registration yielding raw payloads in arrival order.
///
/// A stream owns exactly one underlying connection. It is released by
/// [`MessageStream::close`], or by dropping the stream if the owner never
/// gets the chance to close it.
#[async_trait]
pub trait MessageStream: Send {
    /// Wait for the next payload.
    ///
    /// An error means the underlying connection is gone; implementations
    /// never reconnect on their own.
    async fn recv(&mut self) -> AppResult<String>;

    /// Deregister interest and release the underlying connection.
    async fn close(self: Box<Self>);
}

/// A source of asynchronous change notifications on named channels
/// (PostgreSQL `LISTEN/NOTIFY` in production).
#[async_trait]
pub trait NotificationSource: Send + Sync + std::fmt::Debug + 'static {
    /// Open a dedicated connection and register interest in `channel`.
    async fn listen(&self, channel: &str) -> AppResult<Box<dyn MessageStream>>;
}
