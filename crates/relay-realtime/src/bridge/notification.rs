//! Database bridge for one user's notification stream.
//!
//! Notifications on the channel are wake-up signals. A refresher task
//! re-reads the user's most recent notification and delivers it unless it
//! encodes to exactly the frame delivered last, so an updated record is
//! always sent again. Wake-ups arriving while a query is in flight
//! collapse into a single follow-up query.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use relay_core::traits::NotificationStore;

use crate::dispatcher::Dispatcher;
use crate::sink::frame;
use crate::topic::TopicKey;

use super::BridgeFactory;
use super::guard::BridgeGuard;
use super::task::run_bridge;

impl BridgeFactory {
    /// Listen on the notification channel and refresh `user_id`'s topic on
    /// every wake-up.
    pub(crate) fn notification_bridge(&self, user_id: &str) -> BridgeGuard {
        let topic = TopicKey::Notifications(user_id.to_string());
        let source = self.source.clone();
        let store = self.store.clone();
        let dispatcher = self.dispatcher.clone();
        let channel = self.config.notification_channel.clone();
        let user_id = user_id.to_string();

        BridgeGuard::spawn(topic, &self.retiring, move |lease| async move {
            let wake = Arc::new(Notify::new());
            let stop = lease.cancel.child_token();
            let refresher = tokio::spawn(refresh(
                lease.topic.clone(),
                user_id,
                store,
                dispatcher.clone(),
                wake.clone(),
                stop.clone(),
            ));

            run_bridge(
                lease,
                dispatcher,
                &channel,
                source.listen(&channel),
                move |_payload| {
                    wake.notify_one();
                    Ok(())
                },
            )
            .await;

            stop.cancel();
            if let Err(e) = refresher.await {
                warn!(error = %e, "Notification refresher panicked");
            }
        })
    }
}

async fn refresh(
    topic: TopicKey,
    user_id: String,
    store: Arc<dyn NotificationStore>,
    dispatcher: Dispatcher,
    wake: Arc<Notify>,
    stop: CancellationToken,
) {
    let metrics = dispatcher.metrics();
    let mut last: Option<Bytes> = None;

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = wake.notified() => {}
        }

        let latest = tokio::select! {
            _ = stop.cancelled() => break,
            latest = store.latest_for_user(&user_id) => latest,
        };

        let event = match latest {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!(topic = %topic, "No notification to deliver");
                continue;
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "Notification re-query failed");
                continue;
            }
        };
        metrics.event_decoded();

        let encoded = match frame::encode(&event) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Failed to encode notification");
                continue;
            }
        };

        if last.as_ref() == Some(&encoded) {
            debug!(topic = %topic, "Latest notification unchanged");
            continue;
        }

        last = Some(encoded.clone());
        dispatcher.dispatch_frame(&topic, encoded);
    }
}
