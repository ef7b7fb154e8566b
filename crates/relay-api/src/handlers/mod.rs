//! Request handlers.

pub mod health;
pub mod publish;
pub mod stream;
