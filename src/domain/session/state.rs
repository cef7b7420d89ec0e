//! Lifecycle states of a tenant's messaging session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Where a session currently is in its lifecycle.
///
/// ```text
/// Pairing ──► Connected ──► Reconnecting ──► Pairing | Connected
///    │            │               │
///    └────────────┴───────────────┴──────► Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for the engine to finish the handshake, possibly showing a pairing code.
    Pairing,
    /// Handshake complete, traffic flows.
    Connected,
    /// Connection lost, a fresh attempt is scheduled.
    Reconnecting,
    /// Torn down for good.
    Terminated,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Pairing => "pairing",
            SessionState::Connected => "connected",
            SessionState::Reconnecting => "reconnecting",
            SessionState::Terminated => "terminated",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }
}

impl StateMachine for SessionState {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionState::*;
        match self {
            Pairing => vec![Connected, Reconnecting, Terminated],
            Connected => vec![Reconnecting, Terminated],
            Reconnecting => vec![Pairing, Connected, Terminated],
            Terminated => vec![],
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pairing" => Ok(SessionState::Pairing),
            "connected" => Ok(SessionState::Connected),
            "reconnecting" => Ok(SessionState::Reconnecting),
            "terminated" => Ok(SessionState::Terminated),
            other => Err(ValidationError::invalid_format(
                "state",
                format!("unknown session state '{}'", other),
            )),
        }
    }
}
