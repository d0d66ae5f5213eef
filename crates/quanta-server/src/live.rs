//! Live session feed over WebSocket.
//!
//! Every event published for the session is sent as one JSON text frame.
//! Frames from the client are ignored except for close.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};

use quanta_runtime::SessionEvent;

use crate::service::AppState;

/// `GET /sessions/:id/live`
pub async fn live(
    ws: WebSocketUpgrade,
    State(st): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let events = st.hub.subscribe(&session_id);
    ws.on_upgrade(move |socket| forward(socket, events, session_id))
}

async fn forward(
    socket: WebSocket,
    mut events: broadcast::Receiver<SessionEvent>,
    session_id: String,
) {
    let (mut sink, mut incoming) = socket.split();
    tracing::debug!(session_id = %session_id, "live subscriber connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to serialize session event");
                            continue;
                        }
                    };
                    if sink.send(WsMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(session_id = %session_id, skipped, "live subscriber lagging");
                }
                Err(RecvError::Closed) => break,
            },
            frame = incoming.next() => match frame {
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!(session_id = %session_id, "live subscriber disconnected");
}
