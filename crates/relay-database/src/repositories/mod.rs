//! Repository implementations for relay queries.

pub mod notification;

pub use notification::NotificationRepository;
