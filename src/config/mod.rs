//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `TENANT_GATEWAY` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use tenant_gateway::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod credentials;
mod database;
mod error;
mod messaging;
mod reconnect;
mod server;

pub use credentials::CredentialsConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use messaging::MessagingConfig;
pub use reconnect::ReconnectConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection; in-memory stores are used when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Credential bundle location
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Reconnect backoff
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Send limits and fan-out sizing
    #[serde(default)]
    pub messaging: MessagingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `TENANT_GATEWAY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `TENANT_GATEWAY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `TENANT_GATEWAY__DATABASE__URL=...` -> `database.url = ...`
    /// - `TENANT_GATEWAY__RECONNECT__MAX_ATTEMPTS=0` -> retry forever
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TENANT_GATEWAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.credentials.validate()?;
        self.reconnect.validate()?;
        self.messaging.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "TENANT_GATEWAY__DATABASE__URL",
        "TENANT_GATEWAY__SERVER__PORT",
        "TENANT_GATEWAY__SERVER__ENVIRONMENT",
        "TENANT_GATEWAY__RECONNECT__MAX_ATTEMPTS",
        "TENANT_GATEWAY__RECONNECT__MULTIPLIER",
        "TENANT_GATEWAY__MESSAGING__MAX_BULK_DESTINATIONS",
        "TENANT_GATEWAY__CREDENTIALS__BASE_DIR",
    ];

    /// Helper to clear environment variables after testing
    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_with_no_environment_uses_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert!(config.database.is_none());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.reconnect.max_attempts, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_database_section() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("TENANT_GATEWAY__DATABASE__URL", "postgresql://test@localhost/test");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        let database = config.database.expect("database section");
        assert_eq!(
            database.url.expose_secret(),
            "postgresql://test@localhost/test"
        );
        assert_eq!(database.max_connections, 10);
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("TENANT_GATEWAY__SERVER__PORT", "3000");
        env::set_var("TENANT_GATEWAY__RECONNECT__MAX_ATTEMPTS", "0");
        env::set_var("TENANT_GATEWAY__RECONNECT__MULTIPLIER", "1.5");
        env::set_var("TENANT_GATEWAY__MESSAGING__MAX_BULK_DESTINATIONS", "50");
        env::set_var("TENANT_GATEWAY__CREDENTIALS__BASE_DIR", "/var/lib/gateway");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.reconnect.policy().max_attempts, None);
        assert_eq!(config.reconnect.multiplier, 1.5);
        assert_eq!(config.messaging.max_bulk_destinations, 50);
        assert_eq!(
            config.credentials.base_dir,
            std::path::PathBuf::from("/var/lib/gateway")
        );
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("TENANT_GATEWAY__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().is_production());
    }

    #[test]
    fn test_validate_rejects_bad_database_url() {
        let config = AppConfig {
            database: Some(DatabaseConfig {
                url: secrecy::Secret::new("mysql://localhost/x".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidDatabaseUrl));
    }
}
