//! Integration tests for direct publish and health.

mod helpers;

use http::StatusCode;
use serde_json::json;

use helpers::{BROKER_CHANNEL, TestApp, wait_until};

#[tokio::test]
async fn test_local_publish_reaches_every_global_stream() {
    let app = TestApp::new();
    let mut first = app.open_stream("/comments/stream").await;
    let mut second = app.open_stream("/comments/stream").await;

    let response = app
        .request("POST", "/publish", Some(r#"{"content":"hi"}"#))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({"success": true, "mode": "local", "reached": 2})
    );
    assert_eq!(first.next_frame().await, r#"data: {"content":"hi"}"#);
    assert_eq!(second.next_frame().await, r#"data: {"content":"hi"}"#);
}

#[tokio::test]
async fn test_malformed_publish_is_rejected_without_side_effects() {
    let app = TestApp::new();
    let mut stream = app.open_stream("/comments/stream").await;

    for body in ["not json", "[1,2,3]", "42", ""] {
        let response = app.request("POST", "/publish", Some(body)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "body: {body:?}");
        assert_eq!(response.body["error"], "VALIDATION");
    }

    app.request("POST", "/publish", Some(r#"{"content":"ok"}"#))
        .await;
    assert_eq!(stream.next_frame().await, r#"data: {"content":"ok"}"#);
}

#[tokio::test]
async fn test_publish_preserves_field_order() {
    let app = TestApp::new();
    let mut stream = app.open_stream("/comments/stream").await;

    app.request(
        "POST",
        "/publish",
        Some(r#"{"zeta":1,"alpha":{"b":2,"a":1},"event":"comment_created"}"#),
    )
    .await;

    assert_eq!(
        stream.next_frame().await,
        r#"data: {"zeta":1,"alpha":{"b":2,"a":1},"event":"comment_created"}"#
    );
}

#[tokio::test]
async fn test_broker_publish_right_after_connect_round_trips() {
    let app = TestApp::with_broker();
    let mut stream = app.open_stream("/comments/stream").await;

    let response = app
        .request("POST", "/publish", Some(r#"{"content":"hi"}"#))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({"success": true, "mode": "broker", "reached": null})
    );
    assert_eq!(stream.next_frame().await, r#"data: {"content":"hi"}"#);
}

#[tokio::test]
async fn test_broker_publish_failure_is_unavailable() {
    let app = TestApp::with_broker();
    app.pubsub.set_available(false);

    let response = app
        .request("POST", "/publish", Some(r#"{"content":"hi"}"#))
        .await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["error"], "BROKER");
}

#[tokio::test]
async fn test_broker_loss_closes_global_streams() {
    let app = TestApp::with_broker();
    let mut stream = app.open_stream("/comments/stream").await;
    app.wait_for_listeners(BROKER_CHANNEL, 1).await;

    app.pubsub.disconnect(BROKER_CHANNEL);

    assert!(stream.is_closed().await);
    wait_until(|| app.relay.stats().global_topics == 0).await;
}

#[tokio::test]
async fn test_publish_to_post() {
    let app = TestApp::new();
    let mut abc = app.open_stream("/posts/abc/comments/stream").await;
    let mut xyz = app.open_stream("/posts/xyz/comments/stream").await;

    let response = app
        .request("POST", "/posts/abc/publish", Some(r#"{"content":"direct"}"#))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["reached"], 1);
    assert_eq!(abc.next_frame().await, r#"data: {"content":"direct"}"#);
    xyz.expect_silence().await;
}

#[tokio::test]
async fn test_health_reports_relay_state() {
    let app = TestApp::new();
    let _stream = app.open_stream("/comments/stream").await;

    let response = app.request("GET", "/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["database"], "not_configured");
    assert_eq!(response.body["relay"]["mode"], "local");
    assert_eq!(response.body["relay"]["registered_sinks"], 1);
    assert_eq!(response.body["relay"]["metrics"]["sinks_active"], 1);
}
