//! HTTP DTOs for session endpoints.
//!
//! These types decouple the HTTP API from domain types, allowing independent evolution.

use serde::{Deserialize, Serialize};

use crate::application::{BulkReport, BulkResult, ConnectOutcome};
use crate::domain::session::{SessionError, SessionSnapshot, SessionState};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Request to send one message.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    /// Phone number in any common notation, or a qualified address.
    pub to: String,
    pub content: String,
}

/// Request to send one message to many destinations.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkSendRequestDto {
    pub destinations: Vec<String>,
    pub content: String,
    /// Delay between consecutive sends; the server default when omitted.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Current status of one tenant's session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatusResponse {
    pub tenant_id: String,
    pub connected: bool,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
    pub last_activity: String,
    pub reconnect_attempts: u32,
}

impl From<SessionSnapshot> for SessionStatusResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            tenant_id: snapshot.tenant_id.to_string(),
            connected: snapshot.connected,
            state: snapshot.state,
            identity: snapshot.identity,
            pairing_code: snapshot.pairing_code,
            last_activity: snapshot.last_activity.to_rfc3339(),
            reconnect_attempts: snapshot.reconnect_attempts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub already_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
    pub session: SessionStatusResponse,
}

impl From<ConnectOutcome> for ConnectResponse {
    fn from(outcome: ConnectOutcome) -> Self {
        Self {
            success: outcome.success,
            already_connected: outcome.already_connected,
            pairing_code: outcome.pairing_code,
            session: outcome.session.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
}

/// All live sessions.
#[derive(Debug, Clone, Serialize)]
pub struct SessionListResponse {
    pub items: Vec<SessionStatusResponse>,
    pub total: usize,
}

impl From<Vec<SessionSnapshot>> for SessionListResponse {
    fn from(snapshots: Vec<SessionSnapshot>) -> Self {
        let items: Vec<SessionStatusResponse> = snapshots.into_iter().map(Into::into).collect();
        Self {
            total: items.len(),
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub engine_message_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkResultResponse {
    pub destination: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<BulkResult> for BulkResultResponse {
    fn from(result: BulkResult) -> Self {
        Self {
            destination: result.destination,
            success: result.success,
            engine_message_id: result.engine_message_id.map(|id| id.to_string()),
            error: result.error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkSendResponse {
    pub sent_count: usize,
    pub failed_count: usize,
    pub results: Vec<BulkResultResponse>,
}

impl From<BulkReport> for BulkSendResponse {
    fn from(report: BulkReport) -> Self {
        Self {
            sent_count: report.sent_count,
            failed_count: report.failed_count,
            results: report.results.into_iter().map(Into::into).collect(),
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }
}

impl From<&SessionError> for ErrorResponse {
    fn from(error: &SessionError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}
