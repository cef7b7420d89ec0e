//! Health endpoint.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::adapters::websocket::RoomManager;
use crate::application::{SessionCounts, SessionOrchestrator};

#[derive(Clone)]
pub struct HealthState {
    pub orchestrator: Arc<SessionOrchestrator>,
    pub room_manager: Arc<RoomManager>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: SessionCounts,
    pub live_clients: usize,
}

/// GET /health - Liveness plus session counts by state
pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.orchestrator.session_counts(),
        live_clients: state.room_manager.total_client_count().await,
    })
}

pub fn health_routes(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}
