//! Events fanned out to a tenant's subscribers.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::{Session, SessionState};

/// Session-scoped event delivered to every subscriber of the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The engine produced a pairing code to be rendered for the user.
    PairingCodeIssued { code: String },

    /// The session moved to a new lifecycle state.
    StatusChanged {
        connected: bool,
        state: SessionState,
        #[serde(skip_serializing_if = "Option::is_none")]
        identity: Option<String>,
    },

    /// A message with textual content arrived.
    MessageReceived {
        from: String,
        content: String,
        timestamp: Timestamp,
    },
}

impl SessionEvent {
    /// Status change describing the session as it is now.
    pub fn status_of(session: &Session) -> Self {
        SessionEvent::StatusChanged {
            connected: session.is_connected(),
            state: session.state(),
            identity: session.identity().map(str::to_string),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::PairingCodeIssued { .. } => "pairing_code_issued",
            SessionEvent::StatusChanged { .. } => "status_changed",
            SessionEvent::MessageReceived { .. } => "message_received",
        }
    }
}
