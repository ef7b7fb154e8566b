//! # relay-realtime
//!
//! Event fan-out engine for the comment relay. Provides:
//!
//! - Topic keys for post threads, the global comment stream and per-user
//!   notification streams
//! - Streaming sinks with keep-alive and exactly-once teardown
//! - Topic registries that own one bridge subscription per live topic
//! - Database change bridges (`LISTEN/NOTIFY`) and a Redis pub/sub bridge
//! - Broker-backed or local distribution, selected once at startup

pub mod bridge;
pub mod dispatcher;
pub mod metrics;
pub mod mode;
pub mod registry;
pub mod relay;
pub mod sink;
pub mod topic;

pub use bridge::memory_pubsub::MemoryPubSub;
pub use bridge::redis_pubsub::RedisBroker;
pub use dispatcher::Dispatcher;
pub use mode::DistributionMode;
pub use registry::TopicRegistry;
pub use relay::{PublishOutcome, Relay, RelayStats};
pub use sink::stream::SinkStream;
pub use topic::TopicKey;
