//! Server-sent event streaming handlers.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use relay_realtime::{SinkStream, TopicKey};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters of the notification stream.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// User whose notifications to stream.
    pub user_id: Option<String>,
}

/// GET /posts/{slug}/comments/stream
pub async fn post_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let stream = state.relay.subscribe(TopicKey::slug(&slug)?).await?;
    Ok(event_stream(stream))
}

/// GET /comments/stream
pub async fn global_comments(State(state): State<AppState>) -> Result<Response, ApiError> {
    let stream = state.relay.subscribe(TopicKey::Comments).await?;
    Ok(event_stream(stream))
}

/// GET /notifications/stream?user_id={id}
pub async fn notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> Result<Response, ApiError> {
    let user_id = query.user_id.unwrap_or_default();
    let stream = state.relay.subscribe(TopicKey::notifications(&user_id)?).await?;
    Ok(event_stream(stream))
}

/// Wrap a sink stream in an open-ended `text/event-stream` response.
fn event_stream(stream: SinkStream) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream")),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (
                header::HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
