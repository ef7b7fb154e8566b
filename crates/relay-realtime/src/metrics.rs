//! Relay metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Relay-level metrics counters.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Sinks ever opened
    pub sinks_opened: AtomicU64,
    /// Sinks currently active
    pub sinks_active: AtomicU64,
    /// Sinks removed because a write failed or their bridge failed
    pub sinks_evicted: AtomicU64,
    /// Event frames queued to sinks
    pub frames_delivered: AtomicU64,
    /// Source payloads decoded into events
    pub events_decoded: AtomicU64,
    /// Source payloads skipped as undecodable
    pub events_skipped: AtomicU64,
    /// Bridges that lost or failed to open their connection
    pub bridge_failures: AtomicU64,
}

impl RelayMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new sink
    pub fn sink_opened(&self) {
        self.sinks_opened.fetch_add(1, Ordering::Relaxed);
        self.sinks_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a closed sink
    pub fn sink_closed(&self) {
        let _ = self
            .sinks_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
    }

    /// Record an eviction
    pub fn sink_evicted(&self) {
        self.sinks_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record frames queued by one broadcast
    pub fn frames_delivered(&self, count: usize) {
        self.frames_delivered
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a decoded event
    pub fn event_decoded(&self) {
        self.events_decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a skipped payload
    pub fn event_skipped(&self) {
        self.events_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a bridge failure
    pub fn bridge_failed(&self) {
        self.bridge_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sinks_opened: self.sinks_opened.load(Ordering::Relaxed),
            sinks_active: self.sinks_active.load(Ordering::Relaxed),
            sinks_evicted: self.sinks_evicted.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            events_decoded: self.events_decoded.load(Ordering::Relaxed),
            events_skipped: self.events_skipped.load(Ordering::Relaxed),
            bridge_failures: self.bridge_failures.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Sinks ever opened
    pub sinks_opened: u64,
    /// Sinks currently active
    pub sinks_active: u64,
    /// Sinks evicted
    pub sinks_evicted: u64,
    /// Event frames queued to sinks
    pub frames_delivered: u64,
    /// Payloads decoded
    pub events_decoded: u64,
    /// Payloads skipped
    pub events_skipped: u64,
    /// Bridge failures
    pub bridge_failures: u64,
}
