//! WebSocket message types for live session updates.
//!
//! Defines the protocol between server and connected clients:
//! - Server → Client: Connection status, session events, status snapshots, errors, pongs
//! - Client → Server: Pings, status requests

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{TenantId, Timestamp};
use crate::domain::session::{SessionEvent, SessionSnapshot};

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established successfully.
    Connected(ConnectedMessage),

    /// Event published for the tenant.
    #[serde(rename = "session.event")]
    SessionEvent(SessionEventMessage),

    /// Current status, in answer to `request.status`.
    #[serde(rename = "session.status")]
    Status(StatusMessage),

    /// Error occurred.
    Error(ErrorMessage),

    /// Heartbeat response.
    Pong(PongMessage),
}

/// Sent when a client successfully joins a tenant room.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub tenant_id: String,
    pub client_id: String,
    pub timestamp: String,
}

/// A session event with its tenant and publish time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEventMessage {
    pub tenant_id: String,
    pub event: SessionEvent,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub session: SessionSnapshot,
    pub timestamp: String,
}

/// Error message sent to client.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

/// Heartbeat response.
#[derive(Debug, Clone, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

impl ServerMessage {
    pub fn pong() -> Self {
        ServerMessage::Pong(PongMessage {
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }

    pub fn status(session: SessionSnapshot) -> Self {
        ServerMessage::Status(StatusMessage {
            session,
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorMessage {
            code: code.into(),
            message: message.into(),
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Heartbeat request.
    Ping,

    /// Ask for the current status (after reconnecting the websocket).
    #[serde(rename = "request.status")]
    RequestStatus,
}

// ============================================
// Internal Types
// ============================================

/// What travels through a tenant room's broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantEvent {
    pub tenant_id: TenantId,
    pub event: SessionEvent,
    pub timestamp: Timestamp,
}

impl TenantEvent {
    pub fn new(tenant_id: TenantId, event: SessionEvent) -> Self {
        Self {
            tenant_id,
            event,
            timestamp: Timestamp::now(),
        }
    }

    /// Convert to a server message for sending to clients.
    pub fn to_server_message(self) -> ServerMessage {
        ServerMessage::SessionEvent(SessionEventMessage {
            tenant_id: self.tenant_id.to_string(),
            event: self.event,
            timestamp: self.timestamp.to_rfc3339(),
        })
    }
}
