//! HTTP handlers for session endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::{BulkSendRequest, SessionOrchestrator};
use crate::domain::foundation::TenantId;
use crate::domain::session::SessionError;

use super::dto::{
    BulkSendRequestDto, BulkSendResponse, ConnectResponse, DisconnectResponse, ErrorResponse,
    SendMessageRequest, SendMessageResponse, SessionListResponse, SessionStatusResponse,
};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct SessionHandlers {
    orchestrator: Arc<SessionOrchestrator>,
}

impl SessionHandlers {
    pub fn new(orchestrator: Arc<SessionOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/sessions/:tenant_id/connect - Start or resume a session
pub async fn connect_session(
    State(handlers): State<SessionHandlers>,
    Path(tenant_id): Path<String>,
) -> Response {
    let tenant_id = match parse_tenant(tenant_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers.orchestrator.connect(&tenant_id).await {
        Ok(outcome) => (StatusCode::OK, Json(ConnectResponse::from(outcome))).into_response(),
        Err(e) => handle_session_error(e),
    }
}

/// POST /api/sessions/:tenant_id/disconnect - Log out and purge credentials
pub async fn disconnect_session(
    State(handlers): State<SessionHandlers>,
    Path(tenant_id): Path<String>,
) -> Response {
    let tenant_id = match parse_tenant(tenant_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers.orchestrator.disconnect(&tenant_id).await {
        Ok(()) => (StatusCode::OK, Json(DisconnectResponse { success: true })).into_response(),
        Err(e) => handle_session_error(e),
    }
}

/// GET /api/sessions/:tenant_id - Current session status
pub async fn get_session_status(
    State(handlers): State<SessionHandlers>,
    Path(tenant_id): Path<String>,
) -> Response {
    let tenant_id = match parse_tenant(tenant_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let response = SessionStatusResponse::from(handlers.orchestrator.status(&tenant_id));
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /api/sessions - All live sessions
pub async fn list_sessions(State(handlers): State<SessionHandlers>) -> Response {
    let response = SessionListResponse::from(handlers.orchestrator.list_sessions());
    (StatusCode::OK, Json(response)).into_response()
}

/// POST /api/sessions/:tenant_id/messages - Send one message
pub async fn send_message(
    State(handlers): State<SessionHandlers>,
    Path(tenant_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Response {
    let tenant_id = match parse_tenant(tenant_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers
        .orchestrator
        .send(&tenant_id, &req.to, &req.content)
        .await
    {
        Ok(engine_message_id) => {
            let response = SendMessageResponse {
                success: true,
                engine_message_id: engine_message_id.to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_session_error(e),
    }
}

/// POST /api/sessions/:tenant_id/messages/bulk - Send to many destinations
pub async fn send_bulk(
    State(handlers): State<SessionHandlers>,
    Path(tenant_id): Path<String>,
    Json(req): Json<BulkSendRequestDto>,
) -> Response {
    let tenant_id = match parse_tenant(tenant_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let request = BulkSendRequest {
        destinations: req.destinations,
        content: req.content,
        delay: req.delay_ms.map(Duration::from_millis),
    };

    match handlers.orchestrator.send_bulk(&tenant_id, request).await {
        Ok(report) => (StatusCode::OK, Json(BulkSendResponse::from(report))).into_response(),
        Err(e) => handle_session_error(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Error handling
// ════════════════════════════════════════════════════════════════════════════

fn parse_tenant(raw: String) -> Result<TenantId, Response> {
    TenantId::new(raw).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(format!("Invalid tenant id: {}", e))),
        )
            .into_response()
    })
}

fn status_for(error: &SessionError) -> StatusCode {
    match error {
        SessionError::NotConnected(_) => StatusCode::CONFLICT,
        SessionError::InvalidDestination { .. } | SessionError::ValidationFailed { .. } => {
            StatusCode::BAD_REQUEST
        }
        SessionError::EngineTransientFailure(_) => StatusCode::BAD_GATEWAY,
        SessionError::Deauthorized(_) => StatusCode::GONE,
        SessionError::PersistenceFailure(_) | SessionError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn handle_session_error(error: SessionError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!(code = %error.code(), error = %error, "Session request failed");
    }
    (status, Json(ErrorResponse::from(&error))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::new("u1").unwrap()
    }

    #[test]
    fn not_connected_maps_to_409() {
        let response = handle_session_error(SessionError::NotConnected(tenant()));
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn bad_input_maps_to_400() {
        let destination = SessionError::invalid_destination("12", "too short");
        assert_eq!(handle_session_error(destination).status(), StatusCode::BAD_REQUEST);

        let validation = SessionError::validation("content", "empty");
        assert_eq!(handle_session_error(validation).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn engine_failure_maps_to_502() {
        let response = handle_session_error(SessionError::EngineTransientFailure("x".into()));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn deauthorized_maps_to_410() {
        let response = handle_session_error(SessionError::Deauthorized(tenant()));
        assert_eq!(response.status(), StatusCode::GONE);
    }

    #[test]
    fn persistence_failure_maps_to_500() {
        let response = handle_session_error(SessionError::PersistenceFailure("db".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_tenant_is_rejected() {
        let response = parse_tenant("../etc".into()).unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
