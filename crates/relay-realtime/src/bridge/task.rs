//! Receive loop shared by every bridge.

use std::future::Future;

use tracing::{debug, error, info, warn};

use relay_core::result::AppResult;
use relay_core::traits::MessageStream;

use crate::dispatcher::Dispatcher;

use super::guard::BridgeLease;

/// Drive one bridge until it is released or its connection fails.
///
/// `open` establishes the listen registration once any predecessor has
/// let go of its own. Each payload goes to `on_message`; recoverable
/// errors skip the payload, anything else ends the bridge and evicts its
/// topic. The lease is marked listening once the registration is live.
/// The stream is closed exactly once on every exit path after a
/// successful open.
pub(crate) async fn run_bridge<O, H>(
    mut lease: BridgeLease,
    dispatcher: Dispatcher,
    channel: &str,
    open: O,
    mut on_message: H,
) where
    O: Future<Output = AppResult<Box<dyn MessageStream>>> + Send,
    H: FnMut(&str) -> AppResult<()> + Send,
{
    lease.wait_for_predecessor().await;
    let topic = lease.topic.clone();
    let cancel = lease.cancel.clone();
    let metrics = dispatcher.metrics();

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(topic = %topic, "Bridge released before it opened");
            return;
        }
        opened = open => opened,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            error!(topic = %topic, channel = %channel, error = %e, "Bridge failed to open");
            metrics.bridge_failed();
            dispatcher.evict_bridge(&topic, lease.id);
            return;
        }
    };
    lease.mark_listening();
    info!(topic = %topic, channel = %channel, "Bridge listening");

    let mut failed = false;
    loop {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = stream.recv() => received,
        };

        match received.and_then(|payload| on_message(&payload)) {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => {
                warn!(topic = %topic, error = %e, "Skipping undecodable notification");
                metrics.event_skipped();
            }
            Err(e) => {
                error!(topic = %topic, channel = %channel, error = %e, "Bridge connection lost");
                metrics.bridge_failed();
                failed = true;
                break;
            }
        }
    }

    stream.close().await;
    info!(topic = %topic, channel = %channel, "Bridge released");

    if failed {
        let closed = dispatcher.evict_bridge(&topic, lease.id);
        info!(topic = %topic, sinks = closed, "Topic torn down after bridge failure");
    }
}
