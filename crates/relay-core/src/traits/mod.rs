//! Core traits defined in `relay-core` and implemented by other crates.

pub mod broker;
pub mod source;
pub mod store;

pub use broker::Broker;
pub use source::{MessageStream, NotificationSource};
pub use store::NotificationStore;
