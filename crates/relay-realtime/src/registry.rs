//! Topic registry: topic key → active sinks plus the topic's bridge.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::bridge::guard::{BridgeGuard, BridgeId, BridgeReady};
use crate::sink::{Sink, SinkId, WriteOutcome};
use crate::topic::TopicKey;

/// Membership of one live topic.
#[derive(Debug)]
struct TopicEntry {
    sinks: HashMap<SinkId, Arc<Sink>>,
    /// Released by dropping, which happens under the shard lock.
    bridge: Option<BridgeGuard>,
}

/// Outcome of writing one frame to a topic.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    /// Sinks the frame was queued for.
    pub delivered: usize,
    /// Sinks that were not open and silently skipped.
    pub dropped: usize,
    /// Sinks whose write failed and that must be evicted.
    pub failed: Vec<Arc<Sink>>,
}

/// Registry of active topics and their sinks.
///
/// Every membership change for a topic happens under that topic's shard
/// lock, including attaching and releasing its bridge. An entry with no
/// sinks never survives an operation.
#[derive(Debug)]
pub struct TopicRegistry {
    name: &'static str,
    topics: DashMap<TopicKey, TopicEntry>,
}

impl TopicRegistry {
    /// Creates an empty registry. `name` is only used in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            topics: DashMap::new(),
        }
    }

    /// Registers `sink` under its topic.
    ///
    /// `attach` runs exactly once, when the entry is created, and returns
    /// the bridge owned by the new entry. Returns whether the entry was
    /// created.
    pub fn subscribe<F>(&self, sink: Arc<Sink>, attach: F) -> bool
    where
        F: FnOnce() -> Option<BridgeGuard>,
    {
        let topic = sink.topic().clone();
        let created = match self.topics.entry(topic.clone()) {
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().sinks.insert(sink.id(), sink);
                false
            }
            Entry::Vacant(vacant) => {
                let bridge = attach();
                let mut sinks = HashMap::new();
                sinks.insert(sink.id(), sink);
                vacant.insert(TopicEntry { sinks, bridge });
                true
            }
        };

        if created {
            debug!(registry = self.name, topic = %topic, "Topic created");
        }
        created
    }

    /// Removes a sink. Returns whether the topic entry was deleted, which
    /// also released its bridge. Removing an absent sink is a no-op.
    pub fn unsubscribe(&self, topic: &TopicKey, sink_id: SinkId) -> bool {
        let removed = self.topics.remove_if_mut(topic, |_, entry| {
            if entry.sinks.remove(&sink_id).is_none() || !entry.sinks.is_empty() {
                return false;
            }
            drop(entry.bridge.take());
            true
        });

        if removed.is_some() {
            debug!(registry = self.name, topic = %topic, "Topic released");
        }
        removed.is_some()
    }

    /// Writes `frame` to every sink of `topic`.
    ///
    /// Membership is snapshotted under the lock; writes happen after it is
    /// released.
    pub fn broadcast(&self, topic: &TopicKey, frame: &Bytes) -> BroadcastReport {
        let sinks: Vec<Arc<Sink>> = match self.topics.get(topic) {
            Some(entry) => entry.sinks.values().cloned().collect(),
            None => return BroadcastReport::default(),
        };

        let mut report = BroadcastReport::default();
        for sink in sinks {
            match sink.write(frame) {
                WriteOutcome::Delivered => report.delivered += 1,
                WriteOutcome::Dropped => report.dropped += 1,
                WriteOutcome::Failed => report.failed.push(sink),
            }
        }
        report
    }

    /// Removes the whole topic and returns its sinks.
    pub fn evict_topic(&self, topic: &TopicKey) -> Vec<Arc<Sink>> {
        self.remove_entry(topic, |_| true)
    }

    /// Removes the topic only if it is still served by bridge `id`.
    pub fn evict_bridge(&self, topic: &TopicKey, id: BridgeId) -> Vec<Arc<Sink>> {
        self.remove_entry(topic, |entry| {
            entry.bridge.as_ref().is_some_and(|bridge| bridge.id() == id)
        })
    }

    fn remove_entry<F>(&self, topic: &TopicKey, matches: F) -> Vec<Arc<Sink>>
    where
        F: FnOnce(&TopicEntry) -> bool,
    {
        let removed = self.topics.remove_if_mut(topic, |_, entry| {
            if !matches(entry) {
                return false;
            }
            drop(entry.bridge.take());
            true
        });

        match removed {
            Some((_, entry)) => {
                debug!(registry = self.name, topic = %topic, sinks = entry.sinks.len(), "Topic evicted");
                entry.sinks.into_values().collect()
            }
            None => Vec::new(),
        }
    }

    /// Removes every topic and returns all sinks.
    pub fn drain(&self) -> Vec<Arc<Sink>> {
        let topics: Vec<TopicKey> = self.topics.iter().map(|e| e.key().clone()).collect();
        topics
            .iter()
            .flat_map(|topic| self.evict_topic(topic))
            .collect()
    }

    /// Number of sinks subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &TopicKey) -> usize {
        self.topics.get(topic).map(|e| e.sinks.len()).unwrap_or(0)
    }

    /// Whether `topic` currently owns a bridge.
    pub fn has_bridge(&self, topic: &TopicKey) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|e| e.bridge.is_some())
    }

    /// Readiness of the bridge serving `topic`, if the topic has one.
    pub fn bridge_ready(&self, topic: &TopicKey) -> Option<BridgeReady> {
        self.topics
            .get(topic)
            .and_then(|e| e.bridge.as_ref().map(BridgeGuard::ready))
    }

    /// Number of live topics.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Number of sinks across all topics.
    pub fn sink_count(&self) -> usize {
        self.topics.iter().map(|e| e.sinks.len()).sum()
    }
}
