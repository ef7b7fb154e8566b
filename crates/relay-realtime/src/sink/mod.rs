//! Streaming sinks: one per connected client.
//!
//! A sink moves through `Connecting → Open → Closing → Closed`. Entering
//! `Closing` is a compare-and-swap, so whichever path notices the end of
//! the connection first (client disconnect, failed write, bridge
//! teardown) performs the teardown and every later attempt is a no-op.

pub mod frame;
pub mod keepalive;
pub mod stream;

use std::sync::atomic::{AtomicU8, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::topic::TopicKey;

/// Unique sink identifier.
pub type SinkId = Uuid;

/// Lifecycle state of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SinkState {
    /// Registered, stream not yet handed to the transport.
    Connecting = 0,
    /// Receiving event and keep-alive frames.
    Open = 1,
    /// Teardown in progress.
    Closing = 2,
    /// Terminal.
    Closed = 3,
}

impl SinkState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SinkState::Connecting,
            1 => SinkState::Open,
            2 => SinkState::Closing,
            _ => SinkState::Closed,
        }
    }
}

/// Result of writing one frame to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The frame was queued for the client.
    Delivered,
    /// The sink is not open; the frame was discarded without error.
    Dropped,
    /// The client stream is gone or stalled; the sink must be evicted.
    Failed,
}

/// One client connection's outbound stream.
#[derive(Debug)]
pub struct Sink {
    id: SinkId,
    topic: TopicKey,
    state: AtomicU8,
    sender: mpsc::Sender<Bytes>,
    /// Cancelled when the sink closes; stops keep-alive and ends the stream.
    cancel: CancellationToken,
    connected_at: DateTime<Utc>,
}

impl Sink {
    /// Create a sink in `Connecting` state with a bounded frame queue.
    pub fn new(topic: TopicKey, buffer_size: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        let sink = Self {
            id: Uuid::new_v4(),
            topic,
            state: AtomicU8::new(SinkState::Connecting as u8),
            sender,
            cancel: CancellationToken::new(),
            connected_at: Utc::now(),
        };
        (sink, receiver)
    }

    /// Sink identifier.
    pub fn id(&self) -> SinkId {
        self.id
    }

    /// Topic the sink is registered under.
    pub fn topic(&self) -> &TopicKey {
        &self.topic
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SinkState {
        SinkState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// When the client connected.
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Whether the sink accepts frames.
    pub fn is_open(&self) -> bool {
        self.state() == SinkState::Open
    }

    /// `Connecting → Open`. Fails if the sink was torn down meanwhile.
    pub fn mark_open(&self) -> bool {
        self.state
            .compare_exchange(
                SinkState::Connecting as u8,
                SinkState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Enter `Closing`. Returns `true` for exactly one caller.
    pub fn begin_close(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current >= SinkState::Closing as u8 {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                SinkState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Stop keep-alive, end the client stream and enter `Closed`.
    ///
    /// Only the winner of [`Sink::begin_close`] calls this.
    pub fn finish_close(&self) {
        self.cancel.cancel();
        self.state.store(SinkState::Closed as u8, Ordering::Release);
    }

    /// Queue a frame without waiting.
    pub fn write(&self, frame: &Bytes) -> WriteOutcome {
        if !self.is_open() {
            return WriteOutcome::Dropped;
        }
        match self.sender.try_send(frame.clone()) {
            Ok(()) => WriteOutcome::Delivered,
            Err(TrySendError::Full(_)) => {
                warn!(sink_id = %self.id, topic = %self.topic, "Sink queue full, client is not reading");
                WriteOutcome::Failed
            }
            Err(TrySendError::Closed(_)) => WriteOutcome::Failed,
        }
    }

    /// Token cancelled once the sink has closed.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> (Sink, mpsc::Receiver<Bytes>) {
        Sink::new(TopicKey::Slug("abc".into()), 2)
    }

    #[test]
    fn test_writes_while_connecting_are_dropped() {
        let (sink, mut rx) = sink();
        assert_eq!(sink.write(&Bytes::from_static(b"x")), WriteOutcome::Dropped);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_open_sink_queues_frames() {
        let (sink, mut rx) = sink();
        assert!(sink.mark_open());
        assert_eq!(sink.write(&Bytes::from_static(b"x")), WriteOutcome::Delivered);
        assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"x"));
    }

    #[test]
    fn test_full_queue_fails_write() {
        let (sink, _rx) = sink();
        sink.mark_open();
        let frame = Bytes::from_static(b"x");
        assert_eq!(sink.write(&frame), WriteOutcome::Delivered);
        assert_eq!(sink.write(&frame), WriteOutcome::Delivered);
        assert_eq!(sink.write(&frame), WriteOutcome::Failed);
    }

    #[test]
    fn test_dropped_receiver_fails_write() {
        let (sink, rx) = sink();
        sink.mark_open();
        drop(rx);
        assert_eq!(sink.write(&Bytes::from_static(b"x")), WriteOutcome::Failed);
    }

    #[test]
    fn test_close_happens_once() {
        let (sink, _rx) = sink();
        sink.mark_open();
        assert!(sink.begin_close());
        assert!(!sink.begin_close());
        assert_eq!(sink.state(), SinkState::Closing);
        sink.finish_close();
        assert!(!sink.begin_close());
        assert_eq!(sink.state(), SinkState::Closed);
        assert!(sink.cancellation().is_cancelled());
        assert_eq!(sink.write(&Bytes::from_static(b"x")), WriteOutcome::Dropped);
    }

    #[test]
    fn test_cannot_open_after_close() {
        let (sink, _rx) = sink();
        assert!(sink.begin_close());
        assert!(!sink.mark_open());
    }
}
