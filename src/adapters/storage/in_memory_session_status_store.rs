//! In-memory Session Status Store Adapter

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, TenantId};
use crate::ports::{PersistedSessionStatus, SessionStatusStore};

/// In-memory session status storage
///
/// # Panics
///
/// Methods panic if the internal lock is poisoned.
#[derive(Debug, Default)]
pub struct InMemorySessionStatusStore {
    statuses: RwLock<HashMap<TenantId, PersistedSessionStatus>>,
    writes: RwLock<Vec<PersistedSessionStatus>>,
    fail_writes: AtomicBool,
}

impl InMemorySessionStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed a status directly.
    pub fn insert(&self, status: PersistedSessionStatus) {
        self.statuses
            .write()
            .expect("InMemorySessionStatusStore: lock poisoned")
            .insert(status.tenant_id.clone(), status);
    }

    /// Every successful write, in order.
    pub fn write_history(&self) -> Vec<PersistedSessionStatus> {
        self.writes
            .read()
            .expect("InMemorySessionStatusStore: lock poisoned")
            .clone()
    }

    pub fn get(&self, tenant_id: &TenantId) -> Option<PersistedSessionStatus> {
        self.statuses
            .read()
            .expect("InMemorySessionStatusStore: lock poisoned")
            .get(tenant_id)
            .cloned()
    }
}

#[async_trait]
impl SessionStatusStore for InMemorySessionStatusStore {
    async fn write_session_status(
        &self,
        status: &PersistedSessionStatus,
    ) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("session status write rejected"));
        }
        self.insert(status.clone());
        self.writes
            .write()
            .expect("InMemorySessionStatusStore: lock poisoned")
            .push(status.clone());
        Ok(())
    }

    async fn read_session_status(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<PersistedSessionStatus>, DomainError> {
        Ok(self.get(tenant_id))
    }
}
