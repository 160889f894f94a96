//! Agents API endpoint
//!
//! GET /api/agents - List the registered agents in pipeline order

use axum::{routing::get, Extension, Json, Router};
use crewrelay_core::{AgentConfig, MessageRouter};
use std::sync::Arc;

use super::ApiResponse;

async fn list_agents(
    Extension(router): Extension<Arc<MessageRouter>>,
) -> Json<ApiResponse<Vec<AgentConfig>>> {
    let agents = router.registry().iter().cloned().collect();
    Json(ApiResponse::success(agents))
}

pub fn agents_routes() -> Router {
    Router::new().route("/api/agents", get(list_agents))
}
