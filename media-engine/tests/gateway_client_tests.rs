/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Integration tests for the HTTP gateway client against an in-process
//! gateway stub: envelope shape, response classification, and timeouts.


use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::{Json, Router};
use serde_json::json;
use test_helpers::*;

use media_engine::{GatewayConfig, GatewayTransport, HttpGatewayClient, MediaError};
use media_gateway_types::{
    AudioRoomRequest, ConnectionId, HandleId, Plugin, PluginBody, RoomId, SessionDescription,
};

fn client_for(base_url: &str) -> HttpGatewayClient {
    HttpGatewayClient::new(&GatewayConfig {
        url: base_url.to_string(),
        secret: "s3cret".to_string(),
        request_timeout: Duration::from_secs(2),
    })
    .expect("build gateway client")
}

// ── Envelope shape ───────────────────────────────────────────────────────

#[tokio::test]
async fn open_session_posts_a_create_envelope() {
    let (base_url, recorded) = spawn_gateway(Arc::new(|_, _| {
        (
            StatusCode::OK,
            json!({ "action": "success", "data": { "id": 7001 } }),
        )
    }))
    .await;
    let client = client_for(&base_url);

    let connection = client.open_session().await.unwrap();
    assert_eq!(connection.as_str(), "7001");

    let recorded = recorded.lock().unwrap();
    let (path, body) = &recorded[0];
    assert_eq!(path, "/gateway");
    assert_eq!(body["action"], "create");
    assert_eq!(body["secret"], "s3cret");
    assert!(
        !body["transaction"].as_str().unwrap().is_empty(),
        "every request carries a correlation token"
    );
}

#[tokio::test]
async fn attach_posts_to_the_session_path_with_the_plugin_name() {
    let (base_url, recorded) = spawn_gateway(Arc::new(|_, _| {
        (
            StatusCode::OK,
            json!({ "action": "success", "data": { "id": "h-55" } }),
        )
    }))
    .await;
    let client = client_for(&base_url);

    let handle = client
        .attach_handle(&ConnectionId::new("c-9"), Plugin::VideoRouter)
        .await
        .unwrap();
    assert_eq!(handle.as_str(), "h-55");

    let recorded = recorded.lock().unwrap();
    let (path, body) = &recorded[0];
    assert_eq!(path, "/gateway/c-9");
    assert_eq!(body["action"], "attach");
    assert_eq!(body["plugin"], "gateway.plugin.videorouter");
}

#[tokio::test]
async fn send_message_posts_to_the_handle_path_with_body_and_sdp() {
    let (base_url, recorded) = spawn_gateway(ack_responder()).await;
    let client = client_for(&base_url);

    let reply = client
        .send_message(
            &ConnectionId::new("c-9"),
            &HandleId::new("h-55"),
            PluginBody::Audio(AudioRoomRequest::Join {
                room: RoomId::new("r-1"),
                id: "alice".into(),
                muted: true,
            }),
            Some(SessionDescription::offer("v=0...")),
        )
        .await
        .unwrap();
    assert!(reply.data.is_none());

    let recorded = recorded.lock().unwrap();
    let (path, body) = &recorded[0];
    assert_eq!(path, "/gateway/c-9/h-55");
    assert_eq!(body["action"], "message");
    assert_eq!(body["body"]["request"], "join");
    assert_eq!(body["body"]["room"], "r-1");
    assert_eq!(body["body"]["muted"], true);
    assert_eq!(body["sdp"]["type"], "OFFER");
    assert_eq!(body["sdp"]["value"], "v=0...");
}

#[tokio::test]
async fn detach_and_destroy_use_their_own_actions() {
    let (base_url, recorded) = spawn_gateway(ack_responder()).await;
    let client = client_for(&base_url);

    client
        .detach_handle(&ConnectionId::new("c-9"), &HandleId::new("h-55"))
        .await
        .unwrap();
    client.close_session(&ConnectionId::new("c-9")).await.unwrap();

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded[0].0, "/gateway/c-9/h-55");
    assert_eq!(recorded[0].1["action"], "detach");
    assert_eq!(recorded[1].0, "/gateway/c-9");
    assert_eq!(recorded[1].1["action"], "destroy");
}

#[tokio::test]
async fn transactions_differ_between_calls() {
    let (base_url, recorded) = spawn_gateway(ack_responder()).await;
    let client = client_for(&base_url);

    let connection = ConnectionId::new("c-9");
    client.close_session(&connection).await.unwrap();
    client.close_session(&connection).await.unwrap();

    let recorded = recorded.lock().unwrap();
    assert_ne!(
        recorded[0].1["transaction"], recorded[1].1["transaction"],
        "correlation tokens are generated per call"
    );
}

// ── Response classification ──────────────────────────────────────────────

#[tokio::test]
async fn success_payload_is_returned_to_the_caller() {
    let (base_url, _) = spawn_gateway(Arc::new(|_, _| {
        (
            StatusCode::OK,
            json!({ "action": "success", "payload": { "data": { "room": 42 } } }),
        )
    }))
    .await;
    let client = client_for(&base_url);

    let reply = client
        .send_message(
            &ConnectionId::new("c"),
            &HandleId::new("h"),
            PluginBody::Audio(AudioRoomRequest::Create {
                sampling_rate: 16_000,
                record: false,
                is_private: false,
            }),
            None,
        )
        .await
        .unwrap();
    let created: media_gateway_types::RoomCreated = reply.decode().unwrap();
    assert_eq!(created.room.as_str(), "42");
}

#[tokio::test]
async fn plugin_error_payload_is_rejected() {
    let (base_url, _) = spawn_gateway(Arc::new(|_, _| {
        (
            StatusCode::OK,
            json!({
                "action": "success",
                "payload": { "data": { "error_code": 486, "error": "room is full" } }
            }),
        )
    }))
    .await;
    let client = client_for(&base_url);

    let err = client
        .send_message(
            &ConnectionId::new("c"),
            &HandleId::new("h"),
            PluginBody::Audio(AudioRoomRequest::Mute {
                room: RoomId::new("r-1"),
                id: "alice".into(),
            }),
            None,
        )
        .await
        .unwrap_err();
    match err {
        MediaError::GatewayRejected { code, reason } => {
            assert_eq!(code, Some(486));
            assert_eq!(reason, "room is full");
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn top_level_error_action_is_rejected() {
    let (base_url, _) = spawn_gateway(Arc::new(|_, _| {
        (
            StatusCode::OK,
            json!({ "action": "error", "error": { "code": 403, "reason": "unauthorized request" } }),
        )
    }))
    .await;
    let client = client_for(&base_url);

    let err = client.open_session().await.unwrap_err();
    assert!(matches!(
        err,
        MediaError::GatewayRejected { code: Some(403), .. }
    ));
}

#[tokio::test]
async fn unknown_action_is_rejected_not_ignored() {
    let (base_url, _) = spawn_gateway(Arc::new(|_, _| {
        (StatusCode::OK, json!({ "action": "hangup" }))
    }))
    .await;
    let client = client_for(&base_url);

    let err = client.open_session().await.unwrap_err();
    assert!(matches!(err, MediaError::GatewayRejected { code: None, .. }));
}

#[tokio::test]
async fn http_error_status_is_unavailable() {
    let (base_url, _) = spawn_gateway(Arc::new(|_, _| {
        (StatusCode::INTERNAL_SERVER_ERROR, json!({}))
    }))
    .await;
    let client = client_for(&base_url);

    let err = client.open_session().await.unwrap_err();
    assert!(matches!(err, MediaError::GatewayUnavailable(_)));
}

#[tokio::test]
async fn connection_refused_is_unavailable() {
    // Nothing listens here; the port comes from a listener we drop at once.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(&format!("http://{addr}/gateway"));
    let err = client.open_session().await.unwrap_err();
    assert!(matches!(err, MediaError::GatewayUnavailable(_)));
}

#[tokio::test]
async fn slow_gateway_times_out_as_unavailable() {
    let app = Router::new().fallback(|| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Json(json!({ "action": "ack" }))
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = HttpGatewayClient::new(&GatewayConfig {
        url: format!("http://{addr}/gateway"),
        secret: "s3cret".to_string(),
        request_timeout: Duration::from_millis(50),
    })
    .unwrap();

    let err = client.open_session().await.unwrap_err();
    assert!(matches!(err, MediaError::GatewayUnavailable(_)));
}
