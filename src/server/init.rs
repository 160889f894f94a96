//! Server initialization and main run loop

use super::config::AppConfig;
use super::loader::load_config;
use super::providers::resolve_llm_provider;
use super::validation::validate_config;
use anyhow::{Context, Result};
use axum::{routing::get, Extension, Router};
use crewrelay_core::{
    shutdown_signal_with_controller, AgentRegistry, EventBus, MessageRouter, PipelineRunner,
    SessionStore, ShutdownController,
};
use crewrelay_llm::LlmProvider;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Shared components handed to every route
#[derive(Clone)]
pub struct Relay {
    pub router: Arc<MessageRouter>,
    pub pipeline: Arc<PipelineRunner>,
    pub event_bus: Arc<EventBus>,
    pub shutdown: Arc<ShutdownController>,
}

impl Relay {
    /// Wire registry, sessions, router and pipeline around one engine
    pub fn new(config: &AppConfig, provider: Arc<dyn LlmProvider>) -> Self {
        let registry = Arc::new(AgentRegistry::new(provider));
        let sessions = Arc::new(SessionStore::with_max_turns(config.sessions.max_turns));
        let settings = config.llm.completion_settings();

        Self {
            router: Arc::new(MessageRouter::new(
                registry.clone(),
                sessions,
                settings.clone(),
            )),
            pipeline: Arc::new(PipelineRunner::new(registry, config.review.mode, settings)),
            event_bus: Arc::new(EventBus::default()),
            shutdown: ShutdownController::new(),
        }
    }
}

/// All HTTP and WebSocket routes with their shared state
pub fn build_app(relay: &Relay) -> Router {
    Router::new()
        .route("/", get(|| async { "Crewrelay agent relay" }))
        .merge(crate::api::health_routes())
        .merge(crate::api::api_router())
        .merge(crate::websocket::websocket_router())
        .layer(Extension(relay.router.clone()))
        .layer(Extension(relay.pipeline.clone()))
        .layer(Extension(relay.event_bus.clone()))
        .layer(Extension(relay.shutdown.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the server
pub async fn run(port_override: Option<u16>) -> Result<()> {
    info!(
        "Starting Crewrelay v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut config = load_config().context("Failed to load configuration")?;
    if let Some(port) = port_override {
        config.server.port = port;
    }
    validate_config(&config)?;
    info!(
        review_mode = %config.review.mode,
        max_turns = config.sessions.max_turns,
        "Configuration loaded"
    );

    let provider = resolve_llm_provider(&config.llm)?;
    let relay = Relay::new(&config, provider);
    let app = build_app(&relay);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_with_controller(relay.shutdown.clone()))
        .await
        .context("HTTP server error")?;

    info!("Crewrelay shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use crewrelay_llm::MockProvider;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_banner() {
        let relay = Relay::new(&AppConfig::default(), Arc::new(MockProvider::new()));
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();

        let resp = build_app(&relay).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        assert_eq!(&body[..], b"Crewrelay agent relay");
    }

    #[tokio::test]
    async fn test_ws_chat_requires_upgrade() {
        let relay = Relay::new(&AppConfig::default(), Arc::new(MockProvider::new()));
        let req = Request::builder().uri("/ws/chat").body(Body::empty()).unwrap();

        let resp = build_app(&relay).oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn test_unknown_route_returns_404() {
        let relay = Relay::new(&AppConfig::default(), Arc::new(MockProvider::new()));
        let req = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();

        let resp = build_app(&relay).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
