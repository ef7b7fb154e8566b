//! Integration tests for the streaming endpoints.

mod helpers;

use http::StatusCode;

use helpers::{COMMENT_CHANNEL, NOTIFICATION_CHANNEL, TestApp};

#[tokio::test]
async fn test_stream_response_headers() {
    let app = TestApp::new();

    let stream = app.open_stream("/comments/stream").await;

    assert_eq!(stream.status, StatusCode::OK);
    assert_eq!(stream.headers["content-type"], "text/event-stream");
    assert_eq!(stream.headers["cache-control"], "no-cache");
    assert_eq!(stream.headers["x-accel-buffering"], "no");
}

#[tokio::test]
async fn test_comment_changes_are_filtered_by_slug() {
    let app = TestApp::new();
    let mut abc = app.open_stream("/posts/abc/comments/stream").await;
    let mut xyz = app.open_stream("/posts/xyz/comments/stream").await;
    app.wait_for_listeners(COMMENT_CHANNEL, 2).await;

    app.pubsub.send(
        COMMENT_CHANNEL,
        r#"{"event":"INSERT","post_id":"abc","content":"hi"}"#,
    );

    assert_eq!(
        abc.next_frame().await,
        r#"data: {"event":"INSERT","post_id":"abc","content":"hi"}"#
    );
    xyz.expect_silence().await;
}

#[tokio::test]
async fn test_numeric_slug_field_matches() {
    let app = TestApp::new();
    let mut stream = app.open_stream("/posts/42/comments/stream").await;
    app.wait_for_listeners(COMMENT_CHANNEL, 1).await;

    app.pubsub.send(COMMENT_CHANNEL, r#"{"event":"like_updated","post_id":42}"#);

    assert_eq!(
        stream.next_frame().await,
        r#"data: {"event":"like_updated","post_id":42}"#
    );
}

#[tokio::test]
async fn test_undecodable_change_is_skipped() {
    let app = TestApp::new();
    let mut stream = app.open_stream("/posts/abc/comments/stream").await;
    app.wait_for_listeners(COMMENT_CHANNEL, 1).await;

    app.pubsub.send(COMMENT_CHANNEL, "{broken");
    app.pubsub.send(COMMENT_CHANNEL, r#"{"post_id":"abc","content":"after"}"#);

    assert_eq!(
        stream.next_frame().await,
        r#"data: {"post_id":"abc","content":"after"}"#
    );
}

#[tokio::test]
async fn test_last_disconnect_releases_listener() {
    let app = TestApp::new();
    let first = app.open_stream("/posts/abc/comments/stream").await;
    let second = app.open_stream("/posts/abc/comments/stream").await;
    app.wait_for_listeners(COMMENT_CHANNEL, 1).await;
    assert_eq!(app.pubsub.listens_opened(COMMENT_CHANNEL), 1);

    drop(first);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(app.pubsub.listener_count(COMMENT_CHANNEL), 1);

    drop(second);
    app.wait_for_listeners(COMMENT_CHANNEL, 0).await;
    assert_eq!(app.relay.stats().registered_sinks, 0);
}

#[tokio::test]
async fn test_lost_listener_closes_streams() {
    let app = TestApp::new();
    let mut stream = app.open_stream("/posts/abc/comments/stream").await;
    app.wait_for_listeners(COMMENT_CHANNEL, 1).await;

    app.pubsub.disconnect(COMMENT_CHANNEL);

    assert!(stream.is_closed().await);

    let mut fresh = app.open_stream("/posts/abc/comments/stream").await;
    app.wait_for_listeners(COMMENT_CHANNEL, 1).await;
    app.pubsub.send(COMMENT_CHANNEL, r#"{"post_id":"abc"}"#);
    assert_eq!(fresh.next_frame().await, r#"data: {"post_id":"abc"}"#);
}

#[tokio::test]
async fn test_notifications_require_user_id() {
    let app = TestApp::new();

    for path in ["/notifications/stream", "/notifications/stream?user_id=%20%20"] {
        let response = app.request("GET", path, None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error"], "CONFIGURATION");
    }
    assert_eq!(app.pubsub.listens_opened(NOTIFICATION_CHANNEL), 0);
}

#[tokio::test]
async fn test_notification_wakeups_deliver_latest_record() {
    let app = TestApp::new();
    app.store.insert("42", r#"{"id":1,"user_id":"42","type":"comment"}"#);
    app.store.insert("42", r#"{"id":2,"user_id":"42","type":"like"}"#);

    let mut stream = app.open_stream("/notifications/stream?user_id=42").await;

    for _ in 0..3 {
        app.pubsub.send(NOTIFICATION_CHANNEL, r#"{"user_id":"42"}"#);
    }

    assert_eq!(
        stream.next_frame().await,
        r#"data: {"id":2,"user_id":"42","type":"like"}"#
    );
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(app.store.queries() <= 2);
}

#[tokio::test]
async fn test_updated_notification_is_delivered_again() {
    let app = TestApp::new();
    app.store.insert("42", r#"{"id":1,"user_id":"42","is_read":false}"#);
    let mut stream = app.open_stream("/notifications/stream?user_id=42").await;

    app.pubsub.send(NOTIFICATION_CHANNEL, "{}");
    assert_eq!(
        stream.next_frame().await,
        r#"data: {"id":1,"user_id":"42","is_read":false}"#
    );

    app.store.insert("42", r#"{"id":1,"user_id":"42","is_read":true}"#);
    app.pubsub.send(NOTIFICATION_CHANNEL, "{}");
    assert_eq!(
        stream.next_frame().await,
        r#"data: {"id":1,"user_id":"42","is_read":true}"#
    );
}

#[tokio::test]
async fn test_comment_change_right_after_connect() {
    let app = TestApp::new();
    let mut stream = app.open_stream("/posts/abc/comments/stream").await;

    app.pubsub.send(COMMENT_CHANNEL, r#"{"post_id":"abc"}"#);

    assert_eq!(stream.next_frame().await, r#"data: {"post_id":"abc"}"#);
}

#[tokio::test]
async fn test_stream_fails_when_listen_cannot_open() {
    let app = TestApp::new();
    app.pubsub.set_available(false);

    let response = app.request("GET", "/posts/abc/comments/stream", None).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["error"], "BRIDGE_CONNECTION");
}

#[tokio::test]
async fn test_notification_streams_are_per_user() {
    let app = TestApp::new();
    app.store.insert("42", r#"{"id":1,"user_id":"42"}"#);

    let mut alice = app.open_stream("/notifications/stream?user_id=42").await;
    let mut bob = app.open_stream("/notifications/stream?user_id=7").await;
    app.wait_for_listeners(NOTIFICATION_CHANNEL, 2).await;

    app.pubsub.send(NOTIFICATION_CHANNEL, "{}");

    assert_eq!(alice.next_frame().await, r#"data: {"id":1,"user_id":"42"}"#);
    bob.expect_silence().await;
}

#[tokio::test]
async fn test_keep_alive_frames() {
    let app = TestApp::with_keep_alive(1);
    let mut stream = app.open_stream("/comments/stream").await;

    assert_eq!(stream.next_frame().await, ":");
    assert_eq!(stream.next_frame().await, ":");
}
