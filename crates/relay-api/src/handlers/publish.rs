//! Direct publish handlers.

use axum::Json;
use axum::extract::{Path, State};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use relay_core::error::{AppError, ErrorKind};
use relay_core::events::Event;
use relay_realtime::TopicKey;

use crate::error::ApiError;
use crate::state::AppState;

/// Publish response body.
#[derive(Debug, Serialize)]
pub struct PublishResponse {
    /// Always `true`; failures are reported as errors.
    pub success: bool,
    /// Distribution mode that handled the event.
    pub mode: &'static str,
    /// Local sinks reached, `null` when distributed through the broker.
    pub reached: Option<usize>,
}

/// POST /publish
pub async fn publish(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PublishResponse>, ApiError> {
    let event = parse_event(&body)?;
    let outcome = state.relay.publish(&event).await?;

    info!(mode = outcome.mode, reached = ?outcome.reached, "Event published");
    Ok(Json(PublishResponse {
        success: true,
        mode: outcome.mode,
        reached: outcome.reached,
    }))
}

/// POST /posts/{slug}/publish
pub async fn publish_to_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    body: Bytes,
) -> Result<Json<PublishResponse>, ApiError> {
    let topic = TopicKey::slug(&slug)?;
    let event = parse_event(&body)?;
    let reached = state.relay.publish_to(&topic, &event)?;

    info!(topic = %topic, reached, "Event published to post");
    Ok(Json(PublishResponse {
        success: true,
        mode: "local",
        reached: Some(reached),
    }))
}

/// Decode a request body as an event. Any JSON object is accepted.
fn parse_event(body: &[u8]) -> Result<Event, AppError> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        AppError::with_source(ErrorKind::Validation, "Request body is not valid JSON", e)
    })?;
    Event::from_value(value).map_err(|e| AppError::validation(e.message))
}
