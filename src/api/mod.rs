//! HTTP API for Crewrelay
//!
//! - `/health`: liveness
//! - `/api/agents`: registry listing
//! - `/api/sessions/:role`: inspect or clear an agent's conversation

pub mod agents;
pub mod health;
pub mod sessions;

use axum::Router;
use serde::Serialize;

pub use agents::agents_routes;
pub use health::health_routes;
pub use sessions::sessions_routes;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> ApiResponse<T> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new()
        .merge(agents_routes())
        .merge(sessions_routes())
}
