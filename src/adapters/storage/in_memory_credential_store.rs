//! In-memory Credential Store Adapter
//!
//! Keeps credential bundles in a map. Useful for tests that do not care
//! about the on-disk layout.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::TenantId;
use crate::ports::{CredentialBundle, CredentialStore, CredentialStoreError, CredentialUpdate};

/// In-memory storage for credential bundles
///
/// # Panics
///
/// Methods panic if the internal lock is poisoned.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    bundles: RwLock<HashMap<TenantId, CredentialBundle>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a tenant's credentials directly.
    pub fn insert(&self, tenant_id: TenantId, bundle: CredentialBundle) {
        self.bundles
            .write()
            .expect("InMemoryCredentialStore: lock poisoned")
            .insert(tenant_id, bundle);
    }

    /// True if anything is stored for the tenant.
    pub fn contains(&self, tenant_id: &TenantId) -> bool {
        self.bundles
            .read()
            .expect("InMemoryCredentialStore: lock poisoned")
            .get(tenant_id)
            .is_some_and(|bundle| !bundle.is_empty())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self, tenant_id: &TenantId) -> Result<CredentialBundle, CredentialStoreError> {
        Ok(self
            .bundles
            .read()
            .expect("InMemoryCredentialStore: lock poisoned")
            .get(tenant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn persist(
        &self,
        tenant_id: &TenantId,
        update: &CredentialUpdate,
    ) -> Result<(), CredentialStoreError> {
        let mut bundles = self
            .bundles
            .write()
            .expect("InMemoryCredentialStore: lock poisoned");
        bundles.entry(tenant_id.clone()).or_default().apply(update);
        Ok(())
    }

    async fn purge(&self, tenant_id: &TenantId) -> Result<(), CredentialStoreError> {
        self.bundles
            .write()
            .expect("InMemoryCredentialStore: lock poisoned")
            .remove(tenant_id);
        Ok(())
    }

    async fn list_tenants(&self) -> Result<Vec<TenantId>, CredentialStoreError> {
        let bundles = self
            .bundles
            .read()
            .expect("InMemoryCredentialStore: lock poisoned");
        let mut tenants: Vec<TenantId> = bundles
            .iter()
            .filter(|(_, bundle)| !bundle.is_empty())
            .map(|(tenant_id, _)| tenant_id.clone())
            .collect();
        tenants.sort();
        Ok(tenants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn persist_load_purge() {
        let store = InMemoryCredentialStore::new();
        let tenant = TenantId::new("u1").unwrap();

        store
            .persist(&tenant, &CredentialUpdate::new().set("creds", json!(1)))
            .await
            .unwrap();
        assert!(store.contains(&tenant));
        assert_eq!(store.list_tenants().await.unwrap(), vec![tenant.clone()]);

        store.purge(&tenant).await.unwrap();
        assert!(!store.contains(&tenant));
        assert!(store.load(&tenant).await.unwrap().is_empty());
    }
}
