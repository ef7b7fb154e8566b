//! Route definitions for the relay HTTP API.

use axum::Router;
use axum::routing::{get, post};

use crate::handlers;
use crate::state::AppState;

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(stream_routes())
        .merge(publish_routes())
        .route("/health", get(handlers::health::health))
        .with_state(state)
}

/// Long-lived event streams
fn stream_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/posts/{slug}/comments/stream",
            get(handlers::stream::post_comments),
        )
        .route("/comments/stream", get(handlers::stream::global_comments))
        .route(
            "/notifications/stream",
            get(handlers::stream::notifications),
        )
}

/// Direct publish endpoints
fn publish_routes() -> Router<AppState> {
    Router::new()
        .route("/publish", post(handlers::publish::publish))
        .route(
            "/posts/{slug}/publish",
            post(handlers::publish::publish_to_post),
        )
}
