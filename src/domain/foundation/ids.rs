//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Maximum length of a tenant identifier.
pub const MAX_TENANT_ID_LENGTH: usize = 128;

/// Identifier of the tenant a messaging session is maintained for.
///
/// Tenant ids double as directory names in the credential store, so they
/// are restricted to ASCII alphanumerics plus `-`, `_` and `.`, and may not
/// start with a dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Creates a new TenantId, returning error if empty or malformed.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty_field("tenant_id"));
        }
        if id.len() > MAX_TENANT_ID_LENGTH {
            return Err(ValidationError::invalid_format(
                "tenant_id",
                format!("must be at most {} characters", MAX_TENANT_ID_LENGTH),
            ));
        }
        if id.starts_with('.') {
            return Err(ValidationError::invalid_format(
                "tenant_id",
                "must not start with '.'",
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(ValidationError::invalid_format(
                "tenant_id",
                "only letters, digits, '-', '_' and '.' are allowed",
            ));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

/// Unique identifier for a persisted message record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRecordId(Uuid);

impl MessageRecordId {
    /// Creates a new random MessageRecordId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a MessageRecordId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a conversation counterpart (the remote party).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterpartId(Uuid);

impl CounterpartId {
    /// Creates a new random CounterpartId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a CounterpartId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CounterpartId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CounterpartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CounterpartId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Message id assigned by the protocol engine.
///
/// Opaque to us; used only to correlate later delivery-status updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineMessageId(String);

impl EngineMessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EngineMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
