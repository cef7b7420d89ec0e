//! Session aggregate.
//!
//! One `Session` exists per tenant. It is owned by that tenant's worker and
//! only ever mutated through the transition methods below, each of which is
//! checked against [`SessionState`]'s state machine.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, StateMachine, TenantId, Timestamp};

use super::SessionState;

/// Session aggregate - lifecycle of one tenant's protocol connection.
///
/// # Invariants
///
/// - `pairing_code` is only present while `state == Pairing`
/// - `identity` is only present while `state == Connected`
/// - `reconnect_attempts` is zero whenever `state == Connected`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    tenant_id: TenantId,
    state: SessionState,
    pairing_code: Option<String>,
    identity: Option<String>,
    last_activity: Timestamp,
    reconnect_attempts: u32,
}

impl Session {
    /// Create a session at the start of its first connection attempt.
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            state: SessionState::Pairing,
            pairing_code: None,
            identity: None,
            last_activity: Timestamp::now(),
            reconnect_attempts: 0,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn pairing_code(&self) -> Option<&str> {
        self.pairing_code.as_deref()
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn last_activity(&self) -> &Timestamp {
        &self.last_activity
    }

    /// Consecutive reconnect attempts since the last successful connection.
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a pairing code issued by the engine.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` unless the session is pairing
    pub fn issue_pairing_code(&mut self, code: impl Into<String>) -> Result<(), DomainError> {
        if self.state != SessionState::Pairing {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Pairing code not accepted while {}", self.state),
            ));
        }
        self.pairing_code = Some(code.into());
        self.touch();
        Ok(())
    }

    /// The handshake completed.
    pub fn mark_connected(&mut self, identity: Option<String>) -> Result<(), DomainError> {
        self.transition(SessionState::Connected)?;
        self.pairing_code = None;
        self.identity = identity;
        self.reconnect_attempts = 0;
        Ok(())
    }

    /// The connection closed and another attempt will be made.
    ///
    /// Returns the attempt number being scheduled (1 for the first retry).
    pub fn begin_reconnect(&mut self) -> Result<u32, DomainError> {
        self.transition(SessionState::Reconnecting)?;
        self.pairing_code = None;
        self.identity = None;
        self.reconnect_attempts += 1;
        Ok(self.reconnect_attempts)
    }

    /// The reconnect delay elapsed and a fresh handle is being opened.
    pub fn resume_pairing(&mut self) -> Result<(), DomainError> {
        self.transition(SessionState::Pairing)
    }

    /// Tear the session down for good.
    pub fn terminate(&mut self) -> Result<(), DomainError> {
        self.transition(SessionState::Terminated)?;
        self.pairing_code = None;
        self.identity = None;
        Ok(())
    }

    /// Note traffic on the session.
    pub fn touch(&mut self) {
        self.last_activity = Timestamp::now();
    }

    /// Point-in-time view for status queries and listings.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tenant_id: self.tenant_id.clone(),
            state: self.state,
            connected: self.is_connected(),
            pairing_code: self.pairing_code.clone(),
            identity: self.identity.clone(),
            last_activity: self.last_activity,
            reconnect_attempts: self.reconnect_attempts,
        }
    }

    fn transition(&mut self, target: SessionState) -> Result<(), DomainError> {
        self.state = self.state.transition_to(target).map_err(|e| {
            DomainError::new(ErrorCode::InvalidStateTransition, e.to_string())
                .with_detail("tenant_id", self.tenant_id.as_str())
        })?;
        self.touch();
        Ok(())
    }
}

/// Read-only copy of a session's observable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub tenant_id: TenantId,
    pub state: SessionState,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    pub last_activity: Timestamp,
    pub reconnect_attempts: u32,
}

impl SessionSnapshot {
    /// Snapshot reported for a tenant that has no live session.
    pub fn absent(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            state: SessionState::Terminated,
            connected: false,
            pairing_code: None,
            identity: None,
            last_activity: Timestamp::now(),
            reconnect_attempts: 0,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> Session {
        Session::new(TenantId::new("u1").unwrap())
    }

    fn connected_session() -> Session {
        let mut session = test_session();
        session.mark_connected(Some("15551234567".into())).unwrap();
        session
    }

    // Construction tests

    #[test]
    fn new_session_is_pairing_without_code() {
        let session = test_session();
        assert_eq!(session.state(), SessionState::Pairing);
        assert!(session.pairing_code().is_none());
        assert!(session.identity().is_none());
        assert!(!session.is_connected());
    }

    // Pairing code tests

    #[test]
    fn pairing_code_is_recorded_while_pairing() {
        let mut session = test_session();
        session.issue_pairing_code("2@abc").unwrap();
        assert_eq!(session.pairing_code(), Some("2@abc"));
        assert_eq!(session.state(), SessionState::Pairing);
    }

    #[test]
    fn pairing_code_is_rejected_when_connected() {
        let mut session = connected_session();
        let err = session.issue_pairing_code("2@abc").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        assert!(session.pairing_code().is_none());
    }

    // Connection tests

    #[test]
    fn connecting_clears_pairing_code_and_sets_identity() {
        let mut session = test_session();
        session.issue_pairing_code("2@abc").unwrap();
        session.mark_connected(Some("15551234567".into())).unwrap();

        assert!(session.is_connected());
        assert!(session.pairing_code().is_none());
        assert_eq!(session.identity(), Some("15551234567"));
    }

    #[test]
    fn connecting_resets_reconnect_attempts() {
        let mut session = connected_session();
        session.begin_reconnect().unwrap();
        session.resume_pairing().unwrap();
        session.begin_reconnect().unwrap();
        assert_eq!(session.reconnect_attempts(), 2);

        session.mark_connected(None).unwrap();
        assert_eq!(session.reconnect_attempts(), 0);
    }

    #[test]
    fn connecting_twice_is_rejected() {
        let mut session = connected_session();
        assert!(session.mark_connected(None).is_err());
    }

    // Reconnect tests

    #[test]
    fn begin_reconnect_counts_attempts_and_drops_identity() {
        let mut session = connected_session();
        assert_eq!(session.begin_reconnect().unwrap(), 1);
        assert_eq!(session.state(), SessionState::Reconnecting);
        assert!(session.identity().is_none());
    }

    #[test]
    fn reconnect_from_pairing_clears_code() {
        let mut session = test_session();
        session.issue_pairing_code("2@abc").unwrap();
        session.begin_reconnect().unwrap();
        assert!(session.pairing_code().is_none());
    }

    #[test]
    fn resume_pairing_requires_reconnecting() {
        let mut session = connected_session();
        assert!(session.resume_pairing().is_err());
        assert_eq!(session.state(), SessionState::Connected);
    }

    // Termination tests

    #[test]
    fn terminate_from_any_live_state() {
        let mut pairing = test_session();
        pairing.terminate().unwrap();
        assert!(pairing.is_terminated());

        let mut connected = connected_session();
        connected.terminate().unwrap();
        assert!(connected.identity().is_none());

        let mut reconnecting = connected_session();
        reconnecting.begin_reconnect().unwrap();
        reconnecting.terminate().unwrap();
        assert!(reconnecting.is_terminated());
    }

    #[test]
    fn terminated_session_rejects_every_transition() {
        let mut session = test_session();
        session.terminate().unwrap();

        assert!(session.terminate().is_err());
        assert!(session.mark_connected(None).is_err());
        assert!(session.begin_reconnect().is_err());
        assert_eq!(session.state(), SessionState::Terminated);
    }

    // Snapshot tests

    #[test]
    fn snapshot_never_carries_code_and_identity_together() {
        let mut session = test_session();
        session.issue_pairing_code("2@abc").unwrap();
        let pairing = session.snapshot();
        assert!(pairing.pairing_code.is_some() && pairing.identity.is_none());

        session.mark_connected(Some("1555".into())).unwrap();
        let connected = session.snapshot();
        assert!(connected.pairing_code.is_none() && connected.identity.is_some());
        assert!(connected.connected);
    }

    #[test]
    fn snapshot_json_omits_absent_fields() {
        let json = serde_json::to_value(test_session().snapshot()).unwrap();
        assert_eq!(json["state"], "pairing");
        assert_eq!(json["connected"], false);
        assert!(json.get("pairing_code").is_none());
        assert!(json.get("identity").is_none());
    }

    #[test]
    fn absent_snapshot_is_terminated_and_disconnected() {
        let snapshot = SessionSnapshot::absent(TenantId::new("ghost").unwrap());
        assert!(snapshot.is_terminated());
        assert!(!snapshot.connected);
    }
}
