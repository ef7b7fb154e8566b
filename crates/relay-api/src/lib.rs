//! # relay-api
//!
//! HTTP layer for the comment relay built on Axum.
//!
//! Provides the server-sent event streaming endpoints, direct publish,
//! health reporting, the CORS layer, and error mapping.

pub mod app;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
