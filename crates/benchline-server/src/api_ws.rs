//! WebSocket subscription endpoint for per-session event streams.

use crate::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Extension, Path, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use benchline_events::SUBSCRIBER_QUEUE_CAPACITY;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// WebSocket handler: `GET /ws/sessions/{sid}`.
///
/// The session is looked up before the upgrade, so a connection to an
/// unknown session is rejected with a plain 404 instead of an
/// accepted-then-closed socket.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(sid): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    if !state.store.session_exists(&sid) {
        tracing::warn!(session_id = %sid, "websocket connect to unknown session");
        return StatusCode::NOT_FOUND.into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, sid))
}

/// The unicast frame sent to a subscriber right after registration.
fn greeting_frame(session_id: &str) -> String {
    serde_json::json!({
        "event": "connected",
        "session_id": session_id,
        "data": { "message": format!("Connected to session {session_id}") },
    })
    .to_string()
}

/// Handles one subscriber connection.
///
/// Outbound frames flow through a bounded channel so a slow socket never
/// blocks publishers; a consumer that falls a full queue behind is
/// dropped by the broadcaster. Inbound traffic is limited to the text
/// keepalive: `"ping"` is answered with `"pong"`, a close frame ends the
/// loop and everything else is ignored.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, session_id: String) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::channel::<String>(SUBSCRIBER_QUEUE_CAPACITY);
    let subscriber_id = state.broadcaster.subscribe(&session_id, tx.clone()).await;
    tracing::info!(session_id = %session_id, "websocket subscriber connected");

    state
        .broadcaster
        .send_to(&session_id, subscriber_id, greeting_frame(&session_id))
        .await;

    // Forward queued frames to the socket until either side goes away.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) if text.as_str() == "ping" => {
                if tx.try_send("pong".to_string()).is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Unsubscribe exactly once on the way out; this races harmlessly with
    // the broadcaster's own failed-delivery removal.
    state
        .broadcaster
        .unsubscribe(&session_id, subscriber_id)
        .await;
    send_task.abort();
    tracing::info!(session_id = %session_id, "websocket subscriber disconnected");
}
