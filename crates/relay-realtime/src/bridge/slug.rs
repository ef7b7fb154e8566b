//! Database bridge for one post's comment thread.

use tracing::debug;

use relay_core::events::Event;

use crate::topic::TopicKey;

use super::BridgeFactory;
use super::guard::BridgeGuard;
use super::task::run_bridge;

impl BridgeFactory {
    /// Listen on the comment channel and forward changes whose slug field
    /// matches `slug` to the thread's topic.
    pub(crate) fn slug_bridge(&self, slug: &str) -> BridgeGuard {
        let topic = TopicKey::Slug(slug.to_string());
        let source = self.source.clone();
        let dispatcher = self.dispatcher.clone();
        let channel = self.config.comment_channel.clone();
        let slug_field = self.config.slug_field.clone();
        let slug = slug.to_string();

        BridgeGuard::spawn(topic, &self.retiring, move |lease| async move {
            let topic = lease.topic.clone();
            let metrics = dispatcher.metrics();
            let forward = dispatcher.clone();
            run_bridge(
                lease,
                dispatcher,
                &channel,
                source.listen(&channel),
                move |payload| {
                    let event = Event::decode(payload)?;
                    metrics.event_decoded();
                    if event.correlates_with(&slug_field, &slug) {
                        debug!(topic = %topic, kind = ?event.kind(), "Forwarding comment change");
                        forward.dispatch(&topic, &event)?;
                    }
                    Ok(())
                },
            )
            .await;
        })
    }
}
