//! Periodic keep-alive frames for open sinks.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::dispatcher::Dispatcher;

use super::{Sink, WriteOutcome, frame};

/// Write a keep-alive frame to `sink` every `period` until it closes.
///
/// A failed write tears the sink down.
pub async fn run_keep_alive(sink: Arc<Sink>, period: Duration, dispatcher: Dispatcher) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let frame = frame::keep_alive();

    loop {
        tokio::select! {
            _ = sink.cancellation().cancelled() => break,
            _ = interval.tick() => {}
        }

        if sink.write(&frame) == WriteOutcome::Failed {
            debug!(sink_id = %sink.id(), "Keep-alive write failed");
            dispatcher.evict(&sink);
            break;
        }
    }

    debug!(sink_id = %sink.id(), "Keep-alive loop ended");
}
