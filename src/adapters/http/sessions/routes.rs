//! HTTP routes for session endpoints.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use super::handlers::{
    connect_session, disconnect_session, get_session_status, list_sessions, send_bulk,
    send_message, SessionHandlers,
};

/// Creates the session router with all endpoints.
///
/// Every route except the bulk send is bounded by `request_timeout`; a bulk
/// job legitimately runs for up to destinations × delay.
pub fn session_routes(handlers: SessionHandlers, request_timeout: Duration) -> Router {
    let bounded = Router::new()
        .route("/", get(list_sessions))
        .route("/:tenant_id", get(get_session_status))
        .route("/:tenant_id/connect", post(connect_session))
        .route("/:tenant_id/disconnect", post(disconnect_session))
        .route("/:tenant_id/messages", post(send_message))
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .route("/:tenant_id/messages/bulk", post(send_bulk))
        .merge(bounded)
        .with_state(handlers)
}
