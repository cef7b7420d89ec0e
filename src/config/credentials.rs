//! Credential storage configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Where per-tenant credential bundles live on disk
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    /// Base directory; each tenant gets a subdirectory
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

impl CredentialsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("CREDENTIALS__BASE_DIR"));
        }
        Ok(())
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("./data/credentials")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_dir() {
        let config = CredentialsConfig::default();
        assert_eq!(config.base_dir, PathBuf::from("./data/credentials"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_base_dir_is_rejected() {
        let config = CredentialsConfig {
            base_dir: PathBuf::new(),
        };
        assert!(config.validate().is_err());
    }
}
