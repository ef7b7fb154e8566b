//! Bridges from change sources into topic registries.
//!
//! A bridge is one listen registration serving one topic. It is attached
//! by the registry when the topic's first sink subscribes and released
//! when the last one leaves.

pub mod broker;
pub mod guard;
pub mod memory_pubsub;
pub mod notification;
pub mod redis_pubsub;
pub mod slug;
pub(crate) mod task;

use std::sync::Arc;

use relay_core::config::RealtimeConfig;
use relay_core::traits::{NotificationSource, NotificationStore};

use crate::dispatcher::Dispatcher;
use crate::mode::DistributionMode;
use crate::topic::TopicKey;

pub use guard::{BridgeGuard, BridgeId, BridgeReady, RetiringBridges};

/// Builds the bridge each kind of topic needs.
#[derive(Debug, Clone)]
pub struct BridgeFactory {
    source: Arc<dyn NotificationSource>,
    store: Arc<dyn NotificationStore>,
    dispatcher: Dispatcher,
    mode: DistributionMode,
    retiring: RetiringBridges,
    config: RealtimeConfig,
}

impl BridgeFactory {
    /// Create a factory over the given sources.
    pub fn new(
        source: Arc<dyn NotificationSource>,
        store: Arc<dyn NotificationStore>,
        dispatcher: Dispatcher,
        mode: DistributionMode,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            source,
            store,
            dispatcher,
            mode,
            retiring: RetiringBridges::default(),
            config,
        }
    }

    /// Spawn the bridge for a newly created topic.
    ///
    /// The global topic has no bridge in local mode.
    pub fn attach(&self, topic: &TopicKey) -> Option<BridgeGuard> {
        match topic {
            TopicKey::Slug(slug) => Some(self.slug_bridge(slug)),
            TopicKey::Notifications(user_id) => Some(self.notification_bridge(user_id)),
            TopicKey::Comments => match &self.mode {
                DistributionMode::Local => None,
                DistributionMode::Broker { broker, channel } => {
                    Some(self.broker_bridge(broker.clone(), channel.clone()))
                }
            },
        }
    }

    /// Released bridges still shutting down.
    pub fn retiring(&self) -> &RetiringBridges {
        &self.retiring
    }
}
