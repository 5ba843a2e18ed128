//! Realtime channel: a WebSocket stream of coordinator events.
//!
//! Frames are JSON objects `{"type": ..., "payload": ...}` carrying
//! status updates, emergency alerts and content notifications. The client
//! may send `"ping"` and receives `"pong"`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::coordinator::{Coordinator, PadEvent};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(coordinator): State<Arc<Coordinator>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, coordinator))
}

async fn handle_socket(socket: WebSocket, coordinator: Arc<Coordinator>) {
    let mut events = coordinator.subscribe();
    let (mut sender, mut receiver) = socket.split();

    // Greet with the current status so clients render immediately.
    let initial = PadEvent::StatusUpdate(coordinator.status());
    if let Ok(frame) = serde_json::to_string(&initial) {
        if sender.send(Message::Text(frame)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(frame) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if sender.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "websocket client lagged behind event stream");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) if text == "ping" => {
                        if sender.send(Message::Text("pong".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }
    debug!("websocket client disconnected");
}
