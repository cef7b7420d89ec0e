//! File-based Credential Store Adapter
//!
//! Stores each tenant's credential bundle as one JSON file per entry under
//! `<base_path>/<tenant_id>/`. Writes go through a temporary file and a
//! rename so a crash never leaves a half-written entry behind.

use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::foundation::TenantId;
use crate::ports::{CredentialBundle, CredentialStore, CredentialStoreError, CredentialUpdate};

const ENTRY_EXTENSION: &str = "json";

/// File-based storage for credential bundles
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    base_path: PathBuf,
}

impl FileCredentialStore {
    /// Create a new file store with a base directory
    ///
    /// # Example
    /// ```ignore
    /// let store = FileCredentialStore::new("./data/credentials");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get the directory path for a specific tenant
    fn tenant_dir(&self, tenant_id: &TenantId) -> PathBuf {
        self.base_path.join(tenant_id.as_str())
    }

    /// Get the file path for one credential entry
    fn entry_path(&self, tenant_id: &TenantId, key: &str) -> Result<PathBuf, CredentialStoreError> {
        if key.is_empty() {
            return Err(CredentialStoreError::InvalidKey("empty key".to_string()));
        }
        Ok(self
            .tenant_dir(tenant_id)
            .join(format!("{}.{}", encode_key(key), ENTRY_EXTENSION)))
    }

    async fn write_entry(&self, path: &Path, value: &Value) -> Result<(), CredentialStoreError> {
        let json = serde_json::to_vec_pretty(value)
            .map_err(|e| CredentialStoreError::Serialization(e.to_string()))?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json).await.map_err(io_error)?;
        fs::rename(&tmp, path).await.map_err(io_error)
    }

    async fn remove_entry(&self, path: &Path) -> Result<(), CredentialStoreError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }

    async fn has_entries(dir: &Path) -> Result<bool, CredentialStoreError> {
        let mut entries = fs::read_dir(dir).await.map_err(io_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            if is_entry_file(&entry.path()) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, tenant_id: &TenantId) -> Result<CredentialBundle, CredentialStoreError> {
        let dir = self.tenant_dir(tenant_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CredentialBundle::new()),
            Err(e) => return Err(io_error(e)),
        };

        let mut bundle = BTreeMap::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if !is_entry_file(&path) {
                continue;
            }
            let Some(key) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(decode_key)
            else {
                tracing::warn!(path = %path.display(), "Skipping unreadable credential file name");
                continue;
            };

            let raw = fs::read(&path).await.map_err(io_error)?;
            let value = serde_json::from_slice(&raw)
                .map_err(|e| CredentialStoreError::Serialization(e.to_string()))?;
            bundle.insert(key, value);
        }

        Ok(CredentialBundle::from_entries(bundle))
    }

    async fn persist(
        &self,
        tenant_id: &TenantId,
        update: &CredentialUpdate,
    ) -> Result<(), CredentialStoreError> {
        if update.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(self.tenant_dir(tenant_id))
            .await
            .map_err(io_error)?;

        for (key, value) in update.iter() {
            let path = self.entry_path(tenant_id, key)?;
            match value {
                Some(value) => self.write_entry(&path, value).await?,
                None => self.remove_entry(&path).await?,
            }
        }
        Ok(())
    }

    async fn purge(&self, tenant_id: &TenantId) -> Result<(), CredentialStoreError> {
        match fs::remove_dir_all(self.tenant_dir(tenant_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }

    async fn list_tenants(&self) -> Result<Vec<TenantId>, CredentialStoreError> {
        let mut dirs = match fs::read_dir(&self.base_path).await {
            Ok(dirs) => dirs,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(e)),
        };

        let mut tenants = Vec::new();
        while let Some(entry) = dirs.next_entry().await.map_err(io_error)? {
            if !entry.file_type().await.map_err(io_error)?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(tenant_id) = name.to_str().and_then(|n| TenantId::new(n).ok()) else {
                continue;
            };
            if Self::has_entries(&entry.path()).await? {
                tenants.push(tenant_id);
            }
        }
        tenants.sort();
        Ok(tenants)
    }
}

fn io_error(e: std::io::Error) -> CredentialStoreError {
    CredentialStoreError::Io(e.to_string())
}

fn is_entry_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION)
}

/// Everything but `[A-Za-z0-9_-]` is escaped so any key is a safe file name.
const KEY_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'-');

fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ESCAPES).to_string()
}

fn decode_key(encoded: &str) -> Option<String> {
    percent_decode_str(encoded)
        .decode_utf8()
        .ok()
        .map(|key| key.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    async fn create_test_store() -> (FileCredentialStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(temp_dir.path());
        (store, temp_dir)
    }

    #[test]
    fn key_encoding_round_trips() {
        for key in ["creds", "pre-key-1", "app-state-sync-key-AAB/c+=", "a:b.c", "ünï"] {
            let encoded = encode_key(key);
            assert!(!encoded.contains('/') && !encoded.contains('.'));
            assert_eq!(decode_key(&encoded).as_deref(), Some(key));
        }
    }

    #[test]
    fn key_encoding_keeps_dashes_and_underscores() {
        assert_eq!(encode_key("pre-key_1"), "pre-key_1");
        assert_eq!(encode_key("a/b.c"), "a%2Fb%2Ec");
        assert_eq!(decode_key("%FF"), None);
    }

    #[tokio::test]
    async fn test_load_missing_tenant_is_empty() {
        let (store, _temp) = create_test_store().await;
        let bundle = store.load(&tenant("nobody")).await.unwrap();
        assert!(bundle.is_empty());
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let (store, _temp) = create_test_store().await;
        let update = CredentialUpdate::new()
            .set("creds", json!({"me": "15551234567"}))
            .set("pre-key/1", json!([1, 2, 3]));

        store.persist(&tenant("u1"), &update).await.unwrap();
        let bundle = store.load(&tenant("u1")).await.unwrap();

        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.get("creds"), Some(&json!({"me": "15551234567"})));
        assert_eq!(bundle.get("pre-key/1"), Some(&json!([1, 2, 3])));
    }

    #[tokio::test]
    async fn test_null_update_removes_entry() {
        let (store, _temp) = create_test_store().await;
        let t = tenant("u1");
        store
            .persist(&t, &CredentialUpdate::new().set("a", json!(1)).set("b", json!(2)))
            .await
            .unwrap();
        store
            .persist(&t, &CredentialUpdate::new().remove("a").remove("never-existed"))
            .await
            .unwrap();

        let bundle = store.load(&t).await.unwrap();
        assert_eq!(bundle.len(), 1);
        assert!(bundle.get("a").is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let (store, _temp) = create_test_store().await;
        let t = tenant("u1");
        store
            .persist(&t, &CredentialUpdate::new().set("creds", json!(1)))
            .await
            .unwrap();
        store
            .persist(&t, &CredentialUpdate::new().set("creds", json!(2)))
            .await
            .unwrap();

        assert_eq!(store.load(&t).await.unwrap().get("creds"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_purge_removes_everything() {
        let (store, temp) = create_test_store().await;
        let t = tenant("u1");
        store
            .persist(&t, &CredentialUpdate::new().set("creds", json!(1)))
            .await
            .unwrap();

        store.purge(&t).await.unwrap();

        assert!(!temp.path().join("u1").exists());
        assert!(store.load(&t).await.unwrap().is_empty());
        // Purging twice is fine.
        store.purge(&t).await.unwrap();
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let (store, _temp) = create_test_store().await;
        store
            .persist(&tenant("a"), &CredentialUpdate::new().set("creds", json!("a")))
            .await
            .unwrap();
        store
            .persist(&tenant("b"), &CredentialUpdate::new().set("creds", json!("b")))
            .await
            .unwrap();

        store.purge(&tenant("a")).await.unwrap();

        assert!(store.load(&tenant("a")).await.unwrap().is_empty());
        assert_eq!(
            store.load(&tenant("b")).await.unwrap().get("creds"),
            Some(&json!("b"))
        );
    }

    #[tokio::test]
    async fn test_list_tenants_skips_empty_and_foreign_dirs() {
        let (store, temp) = create_test_store().await;
        store
            .persist(&tenant("beta"), &CredentialUpdate::new().set("creds", json!(1)))
            .await
            .unwrap();
        store
            .persist(&tenant("alpha"), &CredentialUpdate::new().set("creds", json!(1)))
            .await
            .unwrap();
        std::fs::create_dir_all(temp.path().join("empty")).unwrap();
        std::fs::create_dir_all(temp.path().join("not valid")).unwrap();
        std::fs::write(temp.path().join("stray.txt"), "x").unwrap();

        let tenants = store.list_tenants().await.unwrap();
        assert_eq!(tenants, vec![tenant("alpha"), tenant("beta")]);
    }

    #[tokio::test]
    async fn test_list_tenants_without_base_dir() {
        let store = FileCredentialStore::new("/nonexistent/credential/base");
        assert!(store.list_tenants().await.unwrap().is_empty());
    }
}
