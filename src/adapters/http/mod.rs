//! HTTP adapters - REST API and router assembly.
//!
//! ```text
//! GET  /health
//! GET  /api/sessions
//! GET  /api/sessions/:tenant_id
//! POST /api/sessions/:tenant_id/connect
//! POST /api/sessions/:tenant_id/disconnect
//! POST /api/sessions/:tenant_id/messages
//! POST /api/sessions/:tenant_id/messages/bulk
//! GET  /api/sessions/:tenant_id/live   (websocket)
//! ```

pub mod health;
pub mod sessions;

pub use health::{health_routes, HealthResponse, HealthState};
pub use sessions::{session_routes, SessionHandlers};

use std::sync::Arc;

use axum::{http::HeaderValue, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::adapters::websocket::{websocket_router, RoomManager, WebSocketState};
use crate::application::SessionOrchestrator;
use crate::config::ServerConfig;

/// Build the complete application router.
pub fn build_router(
    orchestrator: Arc<SessionOrchestrator>,
    room_manager: Arc<RoomManager>,
    server: &ServerConfig,
) -> Router {
    let sessions = session_routes(
        SessionHandlers::new(Arc::clone(&orchestrator)),
        server.request_timeout(),
    );
    let live = websocket_router().with_state(WebSocketState::new(
        Arc::clone(&room_manager),
        Arc::clone(&orchestrator),
    ));
    let health = health_routes(HealthState {
        orchestrator,
        room_manager,
    });

    Router::new()
        .nest("/api/sessions", sessions)
        .nest("/api", live)
        .merge(health)
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
