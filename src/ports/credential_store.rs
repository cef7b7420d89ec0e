//! Credential Store port - durable per-tenant pairing credentials.
//!
//! A tenant's credentials are a keyed set of JSON documents the engine
//! updates incrementally. Keeping them lets a session resume after a
//! restart without pairing again.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::foundation::TenantId;

/// Errors that can occur during credential storage operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Failed to serialize credentials: {0}")]
    Serialization(String),

    #[error("Invalid credential key: {0}")]
    InvalidKey(String),
}

/// All credential entries of one tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialBundle {
    entries: BTreeMap<String, Value>,
}

impl CredentialBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: BTreeMap<String, Value>) -> Self {
        Self { entries }
    }

    /// No entries means the tenant has never paired (or was purged).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }

    /// Apply an incremental update: `Some` writes an entry, `None` removes it.
    pub fn apply(&mut self, update: &CredentialUpdate) {
        for (key, value) in update.iter() {
            match value {
                Some(value) => {
                    self.entries.insert(key.clone(), value.clone());
                }
                None => {
                    self.entries.remove(key);
                }
            }
        }
    }
}

/// Incremental change to a tenant's credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialUpdate {
    entries: BTreeMap<String, Option<Value>>,
}

impl CredentialUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.entries.insert(key.into(), Some(value));
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.entries.insert(key.into(), None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<Value>)> {
        self.entries.iter()
    }
}

/// Port for persisting per-tenant credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load everything stored for the tenant; empty if nothing was stored.
    async fn load(&self, tenant_id: &TenantId) -> Result<CredentialBundle, CredentialStoreError>;

    /// Apply an incremental update.
    async fn persist(
        &self,
        tenant_id: &TenantId,
        update: &CredentialUpdate,
    ) -> Result<(), CredentialStoreError>;

    /// Delete everything stored for the tenant. Succeeds if nothing exists.
    async fn purge(&self, tenant_id: &TenantId) -> Result<(), CredentialStoreError>;

    /// Tenants that currently have stored credentials.
    async fn list_tenants(&self) -> Result<Vec<TenantId>, CredentialStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credential_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn CredentialStore) {}
    }

    #[test]
    fn apply_writes_and_removes_entries() {
        let mut bundle = CredentialBundle::new();
        bundle.apply(
            &CredentialUpdate::new()
                .set("creds", json!({"me": "1555"}))
                .set("pre-key-1", json!("k1")),
        );
        assert_eq!(bundle.len(), 2);

        bundle.apply(&CredentialUpdate::new().remove("pre-key-1"));
        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.get("creds"), Some(&json!({"me": "1555"})));
    }

    #[test]
    fn update_json_uses_null_for_removal() {
        let update = CredentialUpdate::new().remove("old");
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"old": null}));
    }
}
