//! Events WebSocket handler
//!
//! Read-only stream of every relay event from every chat connection.

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use uuid::Uuid;

use crewrelay_core::{EventBus, ShutdownController};

use super::protocol::ServerEvent;

/// WebSocket upgrade handler
pub async fn events_handler(
    ws: WebSocketUpgrade,
    Extension(event_bus): Extension<Arc<EventBus>>,
    Extension(shutdown): Extension<Arc<ShutdownController>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, event_bus, shutdown))
}

async fn handle_socket(
    socket: WebSocket,
    event_bus: Arc<EventBus>,
    shutdown: Arc<ShutdownController>,
) {
    let connection_id = Uuid::new_v4();
    info!("WebSocket events connection established: {}", connection_id);

    // Subscribe before greeting so nothing published after the handshake is lost
    let mut events = event_bus.subscribe();
    let cancelled = shutdown.token();
    let (mut sender, mut receiver) = socket.split();

    let connected = ServerEvent::Connected { connection_id };
    if let Ok(json) = serde_json::to_string(&connected) {
        if sender.send(Message::Text(json)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            if sender.send(Message::Text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(connection_id = %connection_id, missed, "Event observer lagging");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    // Inbound frames are ignored on the observer stream
                    _ => {}
                }
            }
            _ = cancelled.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    info!("WebSocket events connection ended: {}", connection_id);
}
