//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, BodyDataStream};
use futures::StreamExt;
use http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use relay_api::{AppState, build_app};
use relay_core::config::{AppConfig, DatabaseConfig, RealtimeConfig};
use relay_core::events::Event;
use relay_core::result::AppResult;
use relay_core::traits::NotificationStore;
use relay_realtime::{DistributionMode, MemoryPubSub, Relay};

/// Comment change channel used by the test relay.
pub const COMMENT_CHANNEL: &str = "comment_changes";
/// Notification wake-up channel used by the test relay.
pub const NOTIFICATION_CHANNEL: &str = "notification_changes";
/// Broker channel used in broker mode.
pub const BROKER_CHANNEL: &str = "comments";

/// Notification store backed by a map of user id → records, newest last.
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    records: Mutex<HashMap<String, Vec<Event>>>,
    queries: Mutex<usize>,
}

impl MemoryNotificationStore {
    /// Append a record for `user_id`.
    pub fn insert(&self, user_id: &str, json: &str) {
        let event = Event::decode(json).expect("Invalid test record");
        self.records
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(event);
    }

    /// Number of latest-record queries served.
    pub fn queries(&self) -> usize {
        *self.queries.lock().unwrap()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn latest_for_user(&self, user_id: &str) -> AppResult<Option<Event>> {
        *self.queries.lock().unwrap() += 1;
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(user_id)
            .and_then(|records| records.last().cloned()))
    }
}

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Change source and broker
    pub pubsub: Arc<MemoryPubSub>,
    /// Latest-notification store
    pub store: Arc<MemoryNotificationStore>,
    /// Relay engine behind the router
    pub relay: Arc<Relay>,
}

impl TestApp {
    /// Local-mode application
    pub fn new() -> Self {
        Self::build(false, RealtimeConfig::default())
    }

    /// Broker-mode application over the in-memory broker
    pub fn with_broker() -> Self {
        Self::build(true, RealtimeConfig::default())
    }

    /// Local-mode application with a custom keep-alive period
    pub fn with_keep_alive(seconds: u64) -> Self {
        let realtime = RealtimeConfig {
            keep_alive_seconds: seconds,
            ..RealtimeConfig::default()
        };
        Self::build(false, realtime)
    }

    fn build(broker: bool, realtime: RealtimeConfig) -> Self {
        let pubsub = Arc::new(MemoryPubSub::new(64));
        let store = Arc::new(MemoryNotificationStore::default());

        let mode = if broker {
            DistributionMode::broker(pubsub.clone(), BROKER_CHANNEL)
        } else {
            DistributionMode::Local
        };

        let config = AppConfig {
            server: Default::default(),
            database: DatabaseConfig::new("postgres://unused"),
            broker: Default::default(),
            realtime: realtime.clone(),
            logging: Default::default(),
        };

        let relay = Arc::new(Relay::new(realtime, mode, pubsub.clone(), store.clone()));
        let state = AppState::new(Arc::new(config), relay.clone(), None);

        Self {
            router: build_app(state),
            pubsub,
            store,
            relay,
        }
    }

    /// Make an HTTP request to the test app
    pub async fn request(&self, method: &str, path: &str, body: Option<&str>) -> TestResponse {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.unwrap_or_default().to_string()))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Open a streaming endpoint and keep the response body
    pub async fn open_stream(&self, path: &str) -> EventStream {
        let req = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        EventStream {
            status: response.status(),
            headers: response.headers().clone(),
            body: response.into_body().into_data_stream(),
            buffer: String::new(),
        }
    }

    /// Wait until `channel` has exactly `count` live listen registrations
    pub async fn wait_for_listeners(&self, channel: &str, count: usize) {
        wait_until(|| self.pubsub.listener_count(channel) == count).await;
    }
}

/// Poll `condition` until it holds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Condition not reached in time");
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// An open event stream
pub struct EventStream {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    body: BodyDataStream,
    buffer: String,
}

impl EventStream {
    /// Next frame without its blank-line terminator
    pub async fn next_frame(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(5), self.read_frame())
            .await
            .expect("No frame in time")
            .expect("Stream ended")
    }

    /// Whether the server ended the stream
    pub async fn is_closed(&mut self) -> bool {
        tokio::time::timeout(Duration::from_secs(5), self.read_frame())
            .await
            .expect("Stream still open")
            .is_none()
    }

    /// Assert no frame arrives for a short while
    pub async fn expect_silence(&mut self) {
        let frame = tokio::time::timeout(Duration::from_millis(150), self.read_frame()).await;
        assert!(frame.is_err(), "Unexpected frame: {frame:?}");
    }

    async fn read_frame(&mut self) -> Option<String> {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let frame = self.buffer[..end].to_string();
                self.buffer.drain(..end + 2);
                return Some(frame);
            }
            let chunk = self.body.next().await?.expect("Body error");
            self.buffer.push_str(std::str::from_utf8(&chunk).expect("Non UTF-8 frame"));
        }
    }
}
