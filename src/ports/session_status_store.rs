//! Session status store port.
//!
//! Mirrors each session's lifecycle state so that a restarted process can
//! tell which tenants were connected and reconnect them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::domain::session::{Session, SessionState};

/// Last known status of a tenant's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSessionStatus {
    pub tenant_id: TenantId,
    pub state: SessionState,
    pub identity: Option<String>,
    pub last_activity: Timestamp,
}

impl PersistedSessionStatus {
    pub fn of(session: &Session) -> Self {
        Self {
            tenant_id: session.tenant_id().clone(),
            state: session.state(),
            identity: session.identity().map(str::to_string),
            last_activity: *session.last_activity(),
        }
    }

    /// Status recorded when a tenant is torn down without a live session.
    pub fn terminated(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            state: SessionState::Terminated,
            identity: None,
            last_activity: Timestamp::now(),
        }
    }
}

/// Port for session status persistence.
#[async_trait]
pub trait SessionStatusStore: Send + Sync {
    /// Upsert the tenant's status.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn write_session_status(&self, status: &PersistedSessionStatus)
        -> Result<(), DomainError>;

    /// Returns `None` if the tenant never had a status written.
    async fn read_session_status(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<PersistedSessionStatus>, DomainError>;
}
