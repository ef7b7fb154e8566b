//! Routes events to topic registries and evicts failed sinks.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::debug;

use relay_core::events::Event;
use relay_core::result::AppResult;

use crate::bridge::guard::BridgeId;
use crate::metrics::RelayMetrics;
use crate::registry::TopicRegistry;
use crate::sink::{Sink, frame};
use crate::topic::TopicKey;

/// Writes events to the sinks of a topic.
///
/// Owns the two registries: post threads, and the flat registry holding
/// the global stream and per-user notification streams.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    slugs: Arc<TopicRegistry>,
    global: Arc<TopicRegistry>,
    metrics: Arc<RelayMetrics>,
}

impl Dispatcher {
    /// Create a dispatcher with empty registries.
    pub fn new(metrics: Arc<RelayMetrics>) -> Self {
        Self {
            slugs: Arc::new(TopicRegistry::new("slug")),
            global: Arc::new(TopicRegistry::new("global")),
            metrics,
        }
    }

    /// Registry holding `topic`.
    pub fn registry(&self, topic: &TopicKey) -> &TopicRegistry {
        if topic.is_slug_scoped() {
            self.slugs.as_ref()
        } else {
            self.global.as_ref()
        }
    }

    /// Post-thread registry.
    pub fn slugs(&self) -> &TopicRegistry {
        self.slugs.as_ref()
    }

    /// Global and per-user registry.
    pub fn global(&self) -> &TopicRegistry {
        self.global.as_ref()
    }

    /// Shared metrics.
    pub fn metrics(&self) -> Arc<RelayMetrics> {
        self.metrics.clone()
    }

    /// Encode `event` once and write it to every sink of `topic`.
    ///
    /// Returns the number of sinks it was queued for.
    pub fn dispatch(&self, topic: &TopicKey, event: &Event) -> AppResult<usize> {
        let encoded = frame::encode(event)?;
        Ok(self.dispatch_frame(topic, encoded))
    }

    /// Write an encoded frame to every sink of `topic`, evicting the ones
    /// whose write failed.
    pub fn dispatch_frame(&self, topic: &TopicKey, frame: Bytes) -> usize {
        let report = self.registry(topic).broadcast(topic, &frame);
        self.metrics.frames_delivered(report.delivered);

        for sink in &report.failed {
            debug!(sink_id = %sink.id(), topic = %topic, "Evicting sink after failed write");
            self.evict(sink);
        }
        report.delivered
    }

    /// Tear a sink down: leave its topic, releasing the bridge if it was
    /// the last member, then stop keep-alive. Only the first call acts.
    pub fn teardown(&self, sink: &Arc<Sink>) -> bool {
        if !sink.begin_close() {
            return false;
        }

        let released = self.registry(sink.topic()).unsubscribe(sink.topic(), sink.id());
        sink.finish_close();
        self.metrics.sink_closed();

        debug!(
            sink_id = %sink.id(),
            topic = %sink.topic(),
            bridge_released = released,
            connected_secs = (Utc::now() - sink.connected_at()).num_seconds(),
            "Sink closed"
        );
        true
    }

    /// Tear a sink down after a failed write.
    pub fn evict(&self, sink: &Arc<Sink>) {
        if self.teardown(sink) {
            self.metrics.sink_evicted();
        }
    }

    /// Remove `topic` and close all of its sinks.
    pub fn evict_topic(&self, topic: &TopicKey) -> usize {
        let sinks = self.registry(topic).evict_topic(topic);
        self.close_evicted(sinks)
    }

    /// Remove `topic` if bridge `id` still serves it, closing its sinks.
    pub(crate) fn evict_bridge(&self, topic: &TopicKey, id: BridgeId) -> usize {
        let sinks = self.registry(topic).evict_bridge(topic, id);
        self.close_evicted(sinks)
    }

    /// Close every sink in both registries.
    pub fn close_all(&self) -> usize {
        let mut sinks = self.slugs.drain();
        sinks.extend(self.global.drain());
        self.close_evicted(sinks)
    }

    fn close_evicted(&self, sinks: Vec<Arc<Sink>>) -> usize {
        let mut closed = 0;
        for sink in sinks {
            if sink.begin_close() {
                sink.finish_close();
                self.metrics.sink_closed();
                self.metrics.sink_evicted();
                closed += 1;
            }
        }
        closed
    }
}
