//! WebSocket module for Crewrelay
//!
//! - /ws/chat - agent chat and document review
//! - /ws/events - observer stream of all relay events

pub mod chat;
pub mod events;
pub mod protocol;

pub use chat::chat_handler;
pub use events::events_handler;

use axum::{routing::get, Router};

/// Create the WebSocket router
pub fn websocket_router() -> Router {
    Router::new()
        .route("/ws/chat", get(chat_handler))
        .route("/ws/events", get(events_handler))
}
