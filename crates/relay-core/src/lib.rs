//! # relay-core
//!
//! Core crate for the comment relay. Contains configuration schemas,
//! the event model, the traits implemented by notification sources,
//! brokers and stores, and the unified error system.
//!
//! This crate has **no** internal dependencies on other relay crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use events::Event;
pub use result::AppResult;
