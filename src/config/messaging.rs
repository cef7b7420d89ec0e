//! Messaging limits and fan-out sizing

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Limits applied to sends, connects and event fan-out
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Delay between bulk sends when the caller does not pick one
    #[serde(default = "default_bulk_delay_ms")]
    pub default_bulk_delay_ms: u64,

    /// Largest delay a caller may request between bulk sends
    #[serde(default = "default_max_bulk_delay_ms")]
    pub max_bulk_delay_ms: u64,

    /// Largest number of destinations in one bulk request
    #[serde(default = "default_max_bulk_destinations")]
    pub max_bulk_destinations: usize,

    /// How long connect waits for a pairing code or an open connection
    #[serde(default = "default_pairing_wait_secs")]
    pub pairing_wait_secs: u64,

    /// Buffered events per tenant room before slow subscribers lag
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Bulk jobs that may wait behind the running one, per tenant
    #[serde(default = "default_outbound_queue_depth")]
    pub outbound_queue_depth: usize,
}

impl MessagingConfig {
    pub fn default_bulk_delay(&self) -> Duration {
        Duration::from_millis(self.default_bulk_delay_ms)
    }

    pub fn pairing_wait(&self) -> Duration {
        Duration::from_secs(self.pairing_wait_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_bulk_delay_ms > self.max_bulk_delay_ms {
            return Err(ValidationError::InvalidBulkDelay);
        }
        if self.max_bulk_destinations == 0 {
            return Err(ValidationError::MustBePositive("max_bulk_destinations"));
        }
        if self.pairing_wait_secs == 0 {
            return Err(ValidationError::MustBePositive("pairing_wait_secs"));
        }
        if self.event_channel_capacity == 0 {
            return Err(ValidationError::MustBePositive("event_channel_capacity"));
        }
        if self.outbound_queue_depth == 0 {
            return Err(ValidationError::MustBePositive("outbound_queue_depth"));
        }
        Ok(())
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            default_bulk_delay_ms: default_bulk_delay_ms(),
            max_bulk_delay_ms: default_max_bulk_delay_ms(),
            max_bulk_destinations: default_max_bulk_destinations(),
            pairing_wait_secs: default_pairing_wait_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            outbound_queue_depth: default_outbound_queue_depth(),
        }
    }
}

fn default_bulk_delay_ms() -> u64 {
    1_000
}

fn default_max_bulk_delay_ms() -> u64 {
    60_000
}

fn default_max_bulk_destinations() -> usize {
    500
}

fn default_pairing_wait_secs() -> u64 {
    20
}

fn default_event_channel_capacity() -> usize {
    128
}

fn default_outbound_queue_depth() -> usize {
    16
}
