//! # relay-database
//!
//! PostgreSQL connection management for the relay: the shared pool,
//! the `LISTEN/NOTIFY` change source used by database bridges, and the
//! notification query behind per-user streams.

pub mod connection;
pub mod listener;
pub mod repositories;

pub use connection::DatabasePool;
pub use listener::PgNotificationSource;
pub use repositories::NotificationRepository;
