//! Chat WebSocket handler
//!
//! Each inbound event runs in its own task so a slow completion never blocks
//! the socket loop. Replies come back through a per-connection channel and
//! are also published on the EventBus.
//!
//! On shutdown a connection stops reading and closes only after the replies
//! to its in-flight requests have been sent, or the drain times out.

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crewrelay_core::{
    AgentId, EventBus, MessageRouter, PipelineRunner, ShutdownController, ShutdownPhase,
};

use super::protocol::{ChatMessage, ClientEvent, ServerEvent};

/// Per-connection handles to the shared components
#[derive(Clone)]
struct Connection {
    id: Uuid,
    router: Arc<MessageRouter>,
    pipeline: Arc<PipelineRunner>,
    event_bus: Arc<EventBus>,
    shutdown: Arc<ShutdownController>,
    tx: UnboundedSender<ServerEvent>,
}

impl Connection {
    /// Reply to this client and broadcast to observers
    fn emit(&self, event: ServerEvent) {
        if let Some(relayed) = event.to_relay_event(self.id) {
            self.event_bus.publish(relayed);
        }
        let _ = self.tx.send(event);
    }
}

/// WebSocket upgrade handler
pub async fn chat_handler(
    ws: WebSocketUpgrade,
    Extension(router): Extension<Arc<MessageRouter>>,
    Extension(pipeline): Extension<Arc<PipelineRunner>>,
    Extension(event_bus): Extension<Arc<EventBus>>,
    Extension(shutdown): Extension<Arc<ShutdownController>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, router, pipeline, event_bus, shutdown))
}

async fn handle_socket(
    socket: WebSocket,
    router: Arc<MessageRouter>,
    pipeline: Arc<PipelineRunner>,
    event_bus: Arc<EventBus>,
    shutdown: Arc<ShutdownController>,
) {
    let connection_id = Uuid::new_v4();
    info!("WebSocket chat connection established: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();

    let connected = ServerEvent::Connected { connection_id };
    if let Ok(json) = serde_json::to_string(&connected) {
        if sender.send(Message::Text(json)).await.is_err() {
            return;
        }
    }

    // Spawned handlers reply through this channel
    let (tx, mut internal_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let connection = Connection {
        id: connection_id,
        router,
        pipeline,
        event_bus,
        shutdown,
        tx,
    };
    let shutdown = connection.shutdown.clone();
    let cancelled = shutdown.token();
    let mut phases = shutdown.subscribe();
    let mut draining = false;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!(connection_id = %connection_id, "Received frame: {}", text);
                        match ClientEvent::parse(&text) {
                            Ok(event) => handle_client_event(event, &connection),
                            Err(e) => {
                                warn!(connection_id = %connection_id, error = %e, "Rejected frame");
                                connection.emit(ServerEvent::error(e.to_string()));
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket connection closed: {}", connection_id);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
            server_event = internal_rx.recv() => {
                match server_event {
                    Some(event) => {
                        if send_event(&mut sender, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = cancelled.cancelled() => {
                draining = true;
                break;
            }
        }
    }

    if draining {
        // Spawned handlers hold the remaining senders, so the channel closes
        // once every in-flight request of this connection has replied.
        drop(connection);
        debug!(connection_id = %connection_id, "Draining in-flight replies");
        loop {
            tokio::select! {
                biased;
                server_event = internal_rx.recv() => {
                    match server_event {
                        Some(event) => {
                            if send_event(&mut sender, &event).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                phase = phases.recv() => {
                    match phase {
                        Ok(ShutdownPhase::Terminating | ShutdownPhase::Terminated)
                        | Err(RecvError::Closed) => {
                            warn!(connection_id = %connection_id, "Drain abandoned");
                            break;
                        }
                        _ => {}
                    }
                }
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    }

    info!("WebSocket chat connection ended: {}", connection_id);
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => sender.send(Message::Text(json)).await,
        Err(e) => {
            error!(error = %e, "Failed to serialize server event");
            Ok(())
        }
    }
}

/// Start handling one inbound event. Returns immediately.
fn handle_client_event(event: ClientEvent, connection: &Connection) {
    if !connection.shutdown.is_accepting_work() {
        connection.emit(ServerEvent::error("Server is shutting down"));
        return;
    }

    match event {
        ClientEvent::ChatMessage(msg) => handle_chat(msg, connection),
        ClientEvent::ReviewDocument(data) => handle_review(data, connection),
    }
}

fn handle_chat(msg: ChatMessage, connection: &Connection) {
    let agent = match msg.role.parse::<AgentId>() {
        Ok(agent) => agent,
        Err(e) => {
            warn!(connection_id = %connection.id, role = %msg.role, "Chat for unknown agent");
            connection.emit(ServerEvent::error(e.client_message()));
            return;
        }
    };

    let guard = connection.shutdown.register_task();
    let connection = connection.clone();
    tokio::spawn(async move {
        let _guard = guard;
        match connection.router.route(agent, &msg.message).await {
            Ok(response) => {
                connection.emit(ServerEvent::ChatResponse {
                    role: agent,
                    response,
                });
            }
            Err(e) => {
                error!(connection_id = %connection.id, agent = %agent, error = %e, "Chat failed");
                connection.emit(ServerEvent::error(e.client_message()));
            }
        }
    });
}

fn handle_review(data: Value, connection: &Connection) {
    let guard = connection.shutdown.register_task();
    let connection = connection.clone();
    tokio::spawn(async move {
        let _guard = guard;
        match connection.pipeline.run_review(&data).await {
            Ok(outcome) => {
                connection.emit(ServerEvent::review_complete(outcome.feedback));
            }
            Err(e) => {
                error!(connection_id = %connection.id, error = %e, "Review failed");
                connection.emit(ServerEvent::error(e.client_message()));
            }
        }
    });
}
