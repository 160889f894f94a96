//! Sessions API endpoints
//!
//! GET    /api/sessions/:role - Snapshot of an agent's conversation
//! DELETE /api/sessions/:role - Forget an agent's conversation
//!
//! `role` is the agent's wire name, URL-encoded ("QA%20Tester").

use axum::{extract::Path, http::StatusCode, routing::get, Extension, Json, Router};
use crewrelay_core::{AgentId, ConversationSession, MessageRouter};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::ApiResponse;

/// Result of a clear
#[derive(Debug, Serialize)]
pub struct ClearedSession {
    pub agent: AgentId,
    pub cleared_turns: usize,
}

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

fn failure<T>(status: StatusCode, message: impl Into<String>) -> ApiResult<T> {
    (status, Json(ApiResponse::error(message)))
}

fn parse_role<T>(role: &str) -> Result<AgentId, ApiResult<T>> {
    role.parse::<AgentId>()
        .map_err(|e| failure(StatusCode::BAD_REQUEST, e.to_string()))
}

async fn get_session(
    Extension(router): Extension<Arc<MessageRouter>>,
    Path(role): Path<String>,
) -> ApiResult<ConversationSession> {
    let agent = match parse_role(&role) {
        Ok(agent) => agent,
        Err(rejection) => return rejection,
    };

    match router.sessions().snapshot(agent).await {
        Some(session) => (StatusCode::OK, Json(ApiResponse::success(session))),
        None => failure(
            StatusCode::NOT_FOUND,
            format!("No session for {}", agent),
        ),
    }
}

async fn clear_session(
    Extension(router): Extension<Arc<MessageRouter>>,
    Path(role): Path<String>,
) -> ApiResult<ClearedSession> {
    let agent = match parse_role(&role) {
        Ok(agent) => agent,
        Err(rejection) => return rejection,
    };

    let Some(cleared_turns) = router.sessions().clear(agent).await else {
        return failure(
            StatusCode::NOT_FOUND,
            format!("No session for {}", agent),
        );
    };
    info!(agent = %agent, turns = cleared_turns, "Session cleared");

    (
        StatusCode::OK,
        Json(ApiResponse::success(ClearedSession {
            agent,
            cleared_turns,
        })),
    )
}

pub fn sessions_routes() -> Router {
    Router::new().route(
        "/api/sessions/:role",
        get(get_session).delete(clear_session),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::config::AppConfig;
    use crate::server::init::{build_app, Relay};
    use axum::body::Body;
    use axum::http::{Method, Request};
    use crewrelay_llm::MockProvider;
    use tower::ServiceExt;

    fn relay() -> Relay {
        Relay::new(&AppConfig::default(), Arc::new(MockProvider::new()))
    }

    async fn send(relay: &Relay, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let resp = build_app(relay).oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_get_session_not_created() {
        let relay = relay();
        let (status, body) = send(&relay, Method::GET, "/api/sessions/QA%20Tester").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        // Looking does not create
        assert!(relay.router.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn test_get_session_unknown_role() {
        let relay = relay();
        let (status, body) = send(&relay, Method::GET, "/api/sessions/DevOps").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Agent not found: DevOps");
    }

    #[tokio::test]
    async fn test_get_session_after_chat() {
        let relay = relay();
        relay.router.route(AgentId::QaTester, "ping").await.unwrap();

        let (status, body) = send(&relay, Method::GET, "/api/sessions/QA%20Tester").await;

        assert_eq!(status, StatusCode::OK);
        let turns = body["data"]["turns"].as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0]["speaker"], "user");
        assert_eq!(turns[0]["text"], "ping");
        assert_eq!(turns[1]["speaker"], "agent");
        assert_eq!(body["data"]["agent"], "QA Tester");
    }

    #[tokio::test]
    async fn test_clear_session() {
        let relay = relay();
        relay
            .router
            .route(AgentId::BackendDeveloper, "hello")
            .await
            .unwrap();

        let (status, body) =
            send(&relay, Method::DELETE, "/api/sessions/Backend%20Developer").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["cleared_turns"], 2);
        assert!(relay
            .router
            .sessions()
            .get(AgentId::BackendDeveloper)
            .await
            .is_empty());

        let (status, _) = send(&relay, Method::DELETE, "/api/sessions/QA%20Tester").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
