//! Reconnect backoff configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::session::ReconnectPolicy;

/// Backoff applied when a session's connection closes
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Growth factor between consecutive attempts (1.0 = fixed delay)
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Upper bound on the delay, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Attempts before giving up; 0 retries forever
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl ReconnectConfig {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts: (self.max_attempts > 0).then_some(self.max_attempts),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ValidationError::InvalidReconnectMultiplier);
        }
        if self.base_delay_ms == 0 || self.base_delay_ms > self.max_delay_ms {
            return Err(ValidationError::InvalidReconnectDelay);
        }
        Ok(())
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_base_delay_ms() -> u64 {
    5_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_max_attempts() -> u32 {
    10
}
