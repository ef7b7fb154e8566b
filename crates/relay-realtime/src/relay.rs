//! Top-level relay engine that ties together registries, bridges and
//! distribution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use relay_core::config::RealtimeConfig;
use relay_core::error::AppError;
use relay_core::events::Event;
use relay_core::result::AppResult;
use relay_core::traits::{NotificationSource, NotificationStore};

use crate::bridge::BridgeFactory;
use crate::dispatcher::Dispatcher;
use crate::metrics::{MetricsSnapshot, RelayMetrics};
use crate::mode::DistributionMode;
use crate::sink::Sink;
use crate::sink::keepalive::run_keep_alive;
use crate::sink::stream::SinkStream;
use crate::topic::TopicKey;

/// Result of a direct publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    /// Distribution mode that handled the publish.
    pub mode: &'static str,
    /// Local sinks reached; unknown when the broker distributes.
    pub reached: Option<usize>,
}

/// Point-in-time view of the relay.
#[derive(Debug, Clone, Serialize)]
pub struct RelayStats {
    /// Distribution mode.
    pub mode: &'static str,
    /// Live post-thread topics.
    pub slug_topics: usize,
    /// Live global and per-user topics.
    pub global_topics: usize,
    /// Registered sinks across both registries.
    pub registered_sinks: usize,
    /// Counters.
    pub metrics: MetricsSnapshot,
}

/// Central relay engine.
#[derive(Debug)]
pub struct Relay {
    dispatcher: Dispatcher,
    bridges: BridgeFactory,
    mode: DistributionMode,
    config: RealtimeConfig,
    metrics: Arc<RelayMetrics>,
    shutting_down: AtomicBool,
}

impl Relay {
    /// Creates a relay over the given change source and store.
    pub fn new(
        config: RealtimeConfig,
        mode: DistributionMode,
        source: Arc<dyn NotificationSource>,
        store: Arc<dyn NotificationStore>,
    ) -> Self {
        let metrics = Arc::new(RelayMetrics::new());
        let dispatcher = Dispatcher::new(metrics.clone());
        let bridges = BridgeFactory::new(
            source,
            store,
            dispatcher.clone(),
            mode.clone(),
            config.clone(),
        );

        info!(mode = %mode, "Relay initialized");

        Self {
            dispatcher,
            bridges,
            mode,
            config,
            metrics,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Open a sink on `topic` and return its frame stream.
    ///
    /// The first sink of a topic attaches the topic's bridge. Returns once
    /// the topic's bridge is listening, so anything published afterwards
    /// reaches the stream. Dropping the stream tears the sink down.
    pub async fn subscribe(&self, topic: TopicKey) -> AppResult<SinkStream> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(AppError::service_unavailable("Relay is shutting down"));
        }

        let (sink, receiver) = Sink::new(topic, self.config.sink_buffer_size);
        let sink = Arc::new(sink);
        self.metrics.sink_opened();

        let topic = sink.topic().clone();
        let registry = self.dispatcher.registry(&topic);
        let created = registry.subscribe(sink.clone(), || self.bridges.attach(&topic));
        let stream = SinkStream::new(sink.clone(), receiver, self.dispatcher.clone());

        if sink.mark_open() {
            tokio::spawn(run_keep_alive(
                sink.clone(),
                Duration::from_secs(self.config.keep_alive_seconds),
                self.dispatcher.clone(),
            ));
        }

        if let Some(ready) = registry.bridge_ready(&topic) {
            let listening = tokio::select! {
                listening = ready.listening() => listening,
                _ = sink.cancellation().cancelled() => false,
            };
            if !listening {
                return Err(AppError::bridge_connection(format!(
                    "Could not listen for changes on {topic}"
                )));
            }
        }

        info!(sink_id = %sink.id(), topic = %topic, topic_created = created, "Sink subscribed");
        Ok(stream)
    }

    /// Publish to the global comment stream.
    ///
    /// Local mode writes to this process's global sinks. Broker mode
    /// publishes to the broker channel, and every relay sharing it
    /// (this one included) delivers the event through its bridge.
    pub async fn publish(&self, event: &Event) -> AppResult<PublishOutcome> {
        match &self.mode {
            DistributionMode::Local => {
                let reached = self.dispatcher.dispatch(&TopicKey::Comments, event)?;
                Ok(PublishOutcome {
                    mode: self.mode.name(),
                    reached: Some(reached),
                })
            }
            DistributionMode::Broker { broker, channel } => {
                broker.publish(channel, &event.to_json()?).await?;
                Ok(PublishOutcome {
                    mode: self.mode.name(),
                    reached: None,
                })
            }
        }
    }

    /// Deliver an event to one topic on this process only.
    pub fn publish_to(&self, topic: &TopicKey, event: &Event) -> AppResult<usize> {
        self.dispatcher.dispatch(topic, event)
    }

    /// Distribution mode.
    pub fn mode(&self) -> &DistributionMode {
        &self.mode
    }

    /// Dispatcher and registries.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns a snapshot of the relay.
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            mode: self.mode.name(),
            slug_topics: self.dispatcher.slugs().topic_count(),
            global_topics: self.dispatcher.global().topic_count(),
            registered_sinks: self.dispatcher.slugs().sink_count()
                + self.dispatcher.global().sink_count(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Close every sink, release every bridge and wait for bridges to let
    /// go of their connections. New subscriptions are refused afterwards.
    pub async fn shutdown(&self) {
        info!("Shutting down relay");
        self.shutting_down.store(true, Ordering::Release);

        let closed = self.dispatcher.close_all();
        self.bridges.retiring().drain().await;

        info!(sinks_closed = closed, "Relay shut down");
    }
}
