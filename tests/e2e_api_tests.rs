//! End-to-end tests for status, health, emergency and the Thai text
//! endpoints.

mod common;

use common::TestServer;
use futures::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn status_reports_engine_state() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let status: serde_json::Value = client
        .get(server.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["running"], true);
    assert_eq!(status["healthy"], true);
    assert_eq!(status["emergency_active"], false);
    assert_eq!(status["slideshow"]["entries"], 0);
    assert_eq!(status["dls"]["queued"], 0);
    // Process uptime of a freshly spawned server.
    assert!(status["uptime"].as_str().unwrap().starts_with("0d 00:00:"));
}

#[tokio::test]
async fn health_endpoint_is_ok_when_engines_are() {
    let server = TestServer::spawn().await;
    let response = server.client().get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn emergency_lifecycle_over_http() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let set = client
        .post(server.url("/emergency"))
        .json(&json!({ "message": "Severe weather", "duration_seconds": 120 }))
        .send()
        .await
        .unwrap();
    assert_eq!(set.status(), StatusCode::NO_CONTENT);

    let status: serde_json::Value = client
        .get(server.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["emergency_active"], true);
    assert_eq!(status["emergency_message"], "Severe weather");
    assert_eq!(status["current_context"], "emergency");

    // The injected alert is queued with a bounded send budget.
    let messages: Vec<serde_json::Value> = client
        .get(server.url("/messages"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let alert = messages
        .iter()
        .find(|m| m["source_id"] == "emergency-override")
        .expect("emergency message not queued");
    assert_eq!(alert["priority"], "emergency");
    assert_eq!(alert["max_sends"], 10);

    let clear = client.delete(server.url("/emergency")).send().await.unwrap();
    assert_eq!(clear.status(), StatusCode::NO_CONTENT);

    let status: serde_json::Value = client
        .get(server.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["emergency_active"], false);
}

#[tokio::test]
async fn empty_emergency_message_is_rejected() {
    let server = TestServer::spawn().await;
    let response = server
        .client()
        .post(server.url("/emergency"))
        .json(&json!({ "message": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn thai_validate_flags_royal_content() {
    let server = TestServer::spawn().await;
    let verdict: serde_json::Value = server
        .client()
        .post(server.url("/thai/validate"))
        .json(&json!({ "text": "พระองค์เสด็จ" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(verdict["is_appropriate"], true);
    assert_eq!(verdict["contains_royal"], true);
    assert_eq!(verdict["requires_special_formatting"], true);
}

#[tokio::test]
async fn thai_convert_round_trips_through_charset() {
    let server = TestServer::spawn().await;
    let converted: serde_json::Value = server
        .client()
        .post(server.url("/thai/convert"))
        .json(&json!({ "text": "สวัสดี Hello" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let hex = converted["bytes_hex"].as_str().unwrap();
    assert!(hex.starts_with("0e"));
    // One byte per code point, plus the profile tag.
    assert_eq!(
        converted["byte_length"].as_u64().unwrap() as usize,
        "สวัสดี Hello".chars().count() + 1
    );
    assert_eq!(converted["requires_complex_layout"], true);
}

#[tokio::test]
async fn thai_calendar_reports_buddhist_era() {
    let server = TestServer::spawn().await;
    let date: serde_json::Value = server
        .client()
        .get(server.url("/thai/calendar"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let year_be = date["year_be"].as_i64().unwrap();
    let year_ce = date["year_ce"].as_i64().unwrap();
    assert_eq!(year_be - year_ce, 543);
    assert!(date["thai_month_name"].as_str().unwrap().len() > 0);
}

#[tokio::test]
async fn websocket_streams_status_and_emergency_events() {
    let server = TestServer::spawn().await;

    let (mut socket, _) = tokio_tungstenite::connect_async(server.ws_url())
        .await
        .expect("websocket connect failed");

    // First frame is the current status.
    let first = socket.next().await.unwrap().unwrap();
    let frame: serde_json::Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
    assert_eq!(frame["type"], "status_update");

    // Ping/pong heartbeat.
    socket.send(Message::Text("ping".into())).await.unwrap();
    let pong = socket.next().await.unwrap().unwrap();
    assert_eq!(pong.to_text().unwrap(), "pong");

    // An emergency broadcast reaches subscribers.
    server.coordinator.set_emergency("ws alert", Some(30));
    let event = loop {
        let msg = socket.next().await.unwrap().unwrap();
        let frame: serde_json::Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
        if frame["type"] == "emergency_alert" {
            break frame;
        }
    };
    assert_eq!(event["payload"]["active"], true);
    assert_eq!(event["payload"]["message"], "ws alert");
}
