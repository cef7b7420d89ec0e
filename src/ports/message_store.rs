//! Message store port.
//!
//! Persists message records and the counterparts they were exchanged with.

use async_trait::async_trait;

use crate::domain::foundation::{CounterpartId, DomainError, EngineMessageId, TenantId};
use crate::domain::messaging::{DeliveryStatus, MessageRecord};

/// Port for message persistence.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Write a new record.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn write_message(&self, record: &MessageRecord) -> Result<(), DomainError>;

    /// Update the delivery status of the tenant's record with this engine id.
    ///
    /// Returns `false` when no such record exists.
    async fn update_message_status(
        &self,
        tenant_id: &TenantId,
        engine_message_id: &EngineMessageId,
        status: DeliveryStatus,
    ) -> Result<bool, DomainError>;

    /// Resolve the counterpart with this bare address, creating it if needed.
    ///
    /// An existing counterpart without a display name picks up the given one.
    async fn find_or_create_counterpart(
        &self,
        tenant_id: &TenantId,
        address: &str,
        display_name: Option<&str>,
    ) -> Result<CounterpartId, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn MessageStore) {}
    }
}
