//! Persisted message records and counterparts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    CounterpartId, EngineMessageId, MessageRecordId, TenantId, Timestamp, ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(Direction::Inbound),
            "outbound" => Ok(Direction::Outbound),
            other => Err(ValidationError::invalid_format(
                "direction",
                format!("unknown direction '{}'", other),
            )),
        }
    }
}

/// Delivery status as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl DeliveryStatus {
    /// Map the engine's numeric acknowledgement level.
    pub fn from_engine_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DeliveryStatus::Failed),
            1 => Some(DeliveryStatus::Pending),
            2 => Some(DeliveryStatus::Sent),
            3 => Some(DeliveryStatus::Delivered),
            4 | 5 => Some(DeliveryStatus::Read),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Read => "read",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "sent" => Ok(DeliveryStatus::Sent),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "read" => Ok(DeliveryStatus::Read),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "delivery_status",
                format!("unknown delivery status '{}'", other),
            )),
        }
    }
}

/// A message as written to the store.
///
/// Immutable once written apart from `status`, which follows the engine's
/// acknowledgements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageRecordId,
    pub tenant_id: TenantId,
    pub direction: Direction,
    pub counterpart_id: Option<CounterpartId>,
    pub counterpart_address: String,
    pub content: String,
    pub status: DeliveryStatus,
    pub engine_message_id: Option<EngineMessageId>,
    pub created_at: Timestamp,
}

impl MessageRecord {
    /// Record for a message received from `counterpart_address`.
    pub fn inbound(
        tenant_id: TenantId,
        counterpart_id: Option<CounterpartId>,
        counterpart_address: impl Into<String>,
        content: impl Into<String>,
        engine_message_id: EngineMessageId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: MessageRecordId::new(),
            tenant_id,
            direction: Direction::Inbound,
            counterpart_id,
            counterpart_address: counterpart_address.into(),
            content: content.into(),
            status: DeliveryStatus::Delivered,
            engine_message_id: Some(engine_message_id),
            created_at,
        }
    }

    /// Record for a message the engine accepted for delivery.
    pub fn outbound(
        tenant_id: TenantId,
        counterpart_id: Option<CounterpartId>,
        counterpart_address: impl Into<String>,
        content: impl Into<String>,
        engine_message_id: EngineMessageId,
    ) -> Self {
        Self {
            id: MessageRecordId::new(),
            tenant_id,
            direction: Direction::Outbound,
            counterpart_id,
            counterpart_address: counterpart_address.into(),
            content: content.into(),
            status: DeliveryStatus::Sent,
            engine_message_id: Some(engine_message_id),
            created_at: Timestamp::now(),
        }
    }
}

/// The remote party of a tenant's conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterpart {
    pub id: CounterpartId,
    pub tenant_id: TenantId,
    pub address: String,
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_codes_map_to_statuses() {
        assert_eq!(DeliveryStatus::from_engine_code(0), Some(DeliveryStatus::Failed));
        assert_eq!(DeliveryStatus::from_engine_code(2), Some(DeliveryStatus::Sent));
        assert_eq!(DeliveryStatus::from_engine_code(3), Some(DeliveryStatus::Delivered));
        assert_eq!(DeliveryStatus::from_engine_code(4), Some(DeliveryStatus::Read));
        assert_eq!(DeliveryStatus::from_engine_code(5), Some(DeliveryStatus::Read));
        assert_eq!(DeliveryStatus::from_engine_code(9), None);
    }

    #[test]
    fn inbound_records_are_delivered() {
        let record = MessageRecord::inbound(
            TenantId::new("u1").unwrap(),
            None,
            "15551234567",
            "hello",
            EngineMessageId::new("X1"),
            Timestamp::now(),
        );
        assert_eq!(record.direction, Direction::Inbound);
        assert_eq!(record.status, DeliveryStatus::Delivered);
    }

    #[test]
    fn outbound_records_are_sent_with_engine_id() {
        let record = MessageRecord::outbound(
            TenantId::new("u1").unwrap(),
            None,
            "15551234567",
            "hello",
            EngineMessageId::new("X2"),
        );
        assert_eq!(record.direction, Direction::Outbound);
        assert_eq!(record.status, DeliveryStatus::Sent);
        assert_eq!(record.engine_message_id, Some(EngineMessageId::new("X2")));
    }

    #[test]
    fn status_strings_parse_back() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::Sent,
            DeliveryStatus::Delivered,
            DeliveryStatus::Read,
            DeliveryStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<DeliveryStatus>().unwrap(), status);
        }
        assert_eq!("inbound".parse::<Direction>().unwrap(), Direction::Inbound);
    }
}
