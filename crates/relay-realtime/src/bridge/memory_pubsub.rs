//! In-memory pub/sub for single-node deployments and tests.
//!
//! Serves both as a change-notification source and as a broker. Each
//! channel is a tokio broadcast channel; every listen registration is one
//! receiver, so the number of live registrations is observable.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use relay_core::error::AppError;
use relay_core::result::AppResult;
use relay_core::traits::{Broker, MessageStream, NotificationSource};

/// In-memory pub/sub implementation.
#[derive(Debug)]
pub struct MemoryPubSub {
    /// Channel name → broadcast sender
    channels: DashMap<String, broadcast::Sender<String>>,
    /// Channel name → registrations ever opened
    opened: DashMap<String, usize>,
    /// Buffer size for channels
    buffer_size: usize,
    /// Cleared to simulate an unreachable backend
    available: AtomicBool,
}

impl MemoryPubSub {
    /// Create a new in-memory pub/sub
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: DashMap::new(),
            opened: DashMap::new(),
            buffer_size: buffer_size.max(1),
            available: AtomicBool::new(true),
        }
    }

    /// Deliver a payload to every live registration on `channel`.
    ///
    /// Returns the number of registrations reached.
    pub fn send(&self, channel: &str, payload: &str) -> usize {
        self.channels
            .get(channel)
            .and_then(|tx| tx.send(payload.to_string()).ok())
            .unwrap_or(0)
    }

    /// Live registrations on `channel`.
    pub fn listener_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Registrations ever opened on `channel`.
    pub fn listens_opened(&self, channel: &str) -> usize {
        self.opened.get(channel).map(|n| *n).unwrap_or(0)
    }

    /// Drop `channel`, failing every live registration on it.
    pub fn disconnect(&self, channel: &str) {
        self.channels.remove(channel);
    }

    /// Make new registrations and publishes succeed or fail.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn register(&self, channel: &str) -> AppResult<Box<dyn MessageStream>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(AppError::bridge_connection(format!(
                "In-memory channel '{channel}' is unavailable"
            )));
        }

        let receiver = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer_size).0)
            .subscribe();
        *self.opened.entry(channel.to_string()).or_insert(0) += 1;

        Ok(Box::new(MemoryMessageStream {
            channel: channel.to_string(),
            receiver,
        }))
    }
}

impl Default for MemoryPubSub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl NotificationSource for MemoryPubSub {
    async fn listen(&self, channel: &str) -> AppResult<Box<dyn MessageStream>> {
        self.register(channel)
    }
}

#[async_trait]
impl Broker for MemoryPubSub {
    async fn publish(&self, channel: &str, payload: &str) -> AppResult<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(AppError::broker(format!(
                "In-memory broker rejected publish to '{channel}'"
            )));
        }
        self.send(channel, payload);
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> AppResult<Box<dyn MessageStream>> {
        self.register(channel)
    }
}

/// One receiver on an in-memory channel.
struct MemoryMessageStream {
    channel: String,
    receiver: broadcast::Receiver<String>,
}

#[async_trait]
impl MessageStream for MemoryMessageStream {
    async fn recv(&mut self) -> AppResult<String> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Ok(payload),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel = %self.channel, skipped, "In-memory listener lagged");
                }
                Err(RecvError::Closed) => {
                    return Err(AppError::bridge_connection(format!(
                        "In-memory channel '{}' closed",
                        self.channel
                    )));
                }
            }
        }
    }

    async fn close(self: Box<Self>) {}
}
