//! Ownership of a bridge task by its registry entry.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::topic::TopicKey;

/// Identifies one bridge generation.
pub type BridgeId = u64;

static NEXT_BRIDGE_ID: AtomicU64 = AtomicU64::new(1);

/// Bridge tasks that were released but may still hold their connection.
///
/// A new bridge for the same topic waits on its retiring predecessor
/// before listening, so a topic never has two live listen registrations.
#[derive(Debug, Clone, Default)]
pub struct RetiringBridges {
    handles: Arc<DashMap<TopicKey, JoinHandle<()>>>,
}

impl RetiringBridges {
    fn take(&self, topic: &TopicKey) -> Option<JoinHandle<()>> {
        self.handles.remove(topic).map(|(_, handle)| handle)
    }

    fn retire(&self, topic: TopicKey, handle: JoinHandle<()>) {
        self.handles.retain(|_, h| !h.is_finished());
        self.handles.insert(topic, handle);
    }

    /// Number of released bridges that have not finished yet.
    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait for every released bridge to finish.
    pub async fn drain(&self) {
        let topics: Vec<TopicKey> = self.handles.iter().map(|e| e.key().clone()).collect();
        for topic in topics {
            if let Some(handle) = self.take(&topic) {
                if let Err(e) = handle.await {
                    warn!(topic = %topic, error = %e, "Bridge task panicked");
                }
            }
        }
    }
}

/// Resolves once a bridge's listen registration is live.
#[derive(Debug, Clone)]
pub struct BridgeReady(watch::Receiver<bool>);

impl BridgeReady {
    /// Wait for the bridge to start listening. Returns `false` if the
    /// bridge exited without ever listening.
    pub async fn listening(mut self) -> bool {
        loop {
            if *self.0.borrow_and_update() {
                return true;
            }
            if self.0.changed().await.is_err() {
                return false;
            }
        }
    }
}

/// Handed to a bridge task when it is spawned.
#[derive(Debug)]
pub struct BridgeLease {
    /// Bridge generation.
    pub id: BridgeId,
    /// Topic the bridge serves.
    pub topic: TopicKey,
    /// Cancelled when the registry releases the bridge.
    pub cancel: CancellationToken,
    predecessor: Option<JoinHandle<()>>,
    ready: watch::Sender<bool>,
}

impl BridgeLease {
    /// Report the listen registration as live. Dropping the lease without
    /// calling this releases waiters with a failure.
    pub fn mark_listening(&self) {
        self.ready.send_replace(true);
    }

    /// Wait until the previous bridge for this topic has released its
    /// connection. Runs to completion even if this bridge is cancelled.
    pub async fn wait_for_predecessor(&mut self) {
        if let Some(handle) = self.predecessor.take() {
            if let Err(e) = handle.await {
                warn!(topic = %self.topic, error = %e, "Previous bridge task panicked");
            }
        }
    }
}

/// A running bridge, owned by the registry entry of its topic.
///
/// Dropping the guard cancels the task and parks its handle in
/// [`RetiringBridges`] until it exits.
#[derive(Debug)]
pub struct BridgeGuard {
    id: BridgeId,
    topic: TopicKey,
    cancel: CancellationToken,
    ready: BridgeReady,
    handle: Option<JoinHandle<()>>,
    retiring: RetiringBridges,
}

impl BridgeGuard {
    /// Spawn a bridge task for `topic`.
    pub fn spawn<F, Fut>(topic: TopicKey, retiring: &RetiringBridges, run: F) -> Self
    where
        F: FnOnce(BridgeLease) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = NEXT_BRIDGE_ID.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = watch::channel(false);
        let lease = BridgeLease {
            id,
            topic: topic.clone(),
            cancel: cancel.clone(),
            predecessor: retiring.take(&topic),
            ready: ready_tx,
        };
        let handle = tokio::spawn(run(lease));

        Self {
            id,
            topic,
            cancel,
            ready: BridgeReady(ready_rx),
            handle: Some(handle),
            retiring: retiring.clone(),
        }
    }

    /// Bridge generation.
    pub fn id(&self) -> BridgeId {
        self.id
    }

    /// Readiness of the bridge's listen registration.
    pub fn ready(&self) -> BridgeReady {
        self.ready.clone()
    }
}

impl Drop for BridgeGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            self.retiring.retire(self.topic.clone(), handle);
        }
    }
}
