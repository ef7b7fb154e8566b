//! Broker bridge for the global comment stream.

use std::sync::Arc;

use tracing::debug;

use relay_core::events::Event;
use relay_core::traits::Broker;

use crate::topic::TopicKey;

use super::BridgeFactory;
use super::guard::BridgeGuard;
use super::task::run_bridge;

impl BridgeFactory {
    /// Subscribe to the broker channel and forward every message to the
    /// global topic.
    pub(crate) fn broker_bridge(&self, broker: Arc<dyn Broker>, channel: String) -> BridgeGuard {
        let dispatcher = self.dispatcher.clone();

        BridgeGuard::spawn(TopicKey::Comments, &self.retiring, move |lease| async move {
            let metrics = dispatcher.metrics();
            let forward = dispatcher.clone();
            run_bridge(
                lease,
                dispatcher,
                &channel,
                broker.subscribe(&channel),
                move |payload| {
                    let event = Event::decode(payload)?;
                    metrics.event_decoded();
                    debug!(kind = ?event.kind(), "Forwarding broker event");
                    forward.dispatch(&TopicKey::Comments, &event)?;
                    Ok(())
                },
            )
            .await;
        })
    }
}
