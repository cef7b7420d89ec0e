//! In-memory Message Store Adapter

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::domain::foundation::{CounterpartId, DomainError, EngineMessageId, TenantId};
use crate::domain::messaging::{Counterpart, DeliveryStatus, MessageRecord};
use crate::ports::MessageStore;

/// In-memory message and counterpart storage
///
/// # Panics
///
/// Methods panic if the internal lock is poisoned.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<MessageRecord>>,
    counterparts: RwLock<Vec<Counterpart>>,
    fail_writes: AtomicBool,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent message write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<MessageRecord> {
        self.messages
            .read()
            .expect("InMemoryMessageStore: lock poisoned")
            .clone()
    }

    pub fn messages_for(&self, tenant_id: &TenantId) -> Vec<MessageRecord> {
        self.messages()
            .into_iter()
            .filter(|m| &m.tenant_id == tenant_id)
            .collect()
    }

    pub fn counterparts(&self) -> Vec<Counterpart> {
        self.counterparts
            .read()
            .expect("InMemoryMessageStore: lock poisoned")
            .clone()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn write_message(&self, record: &MessageRecord) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("message write rejected"));
        }
        self.messages
            .write()
            .expect("InMemoryMessageStore: lock poisoned")
            .push(record.clone());
        Ok(())
    }

    async fn update_message_status(
        &self,
        tenant_id: &TenantId,
        engine_message_id: &EngineMessageId,
        status: DeliveryStatus,
    ) -> Result<bool, DomainError> {
        let mut messages = self
            .messages
            .write()
            .expect("InMemoryMessageStore: lock poisoned");
        let record = messages.iter_mut().find(|m| {
            &m.tenant_id == tenant_id && m.engine_message_id.as_ref() == Some(engine_message_id)
        });
        match record {
            Some(record) => {
                record.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_or_create_counterpart(
        &self,
        tenant_id: &TenantId,
        address: &str,
        display_name: Option<&str>,
    ) -> Result<CounterpartId, DomainError> {
        let mut counterparts = self
            .counterparts
            .write()
            .expect("InMemoryMessageStore: lock poisoned");

        if let Some(existing) = counterparts
            .iter_mut()
            .find(|c| &c.tenant_id == tenant_id && c.address == address)
        {
            if existing.display_name.is_none() {
                existing.display_name = display_name.map(str::to_string);
            }
            return Ok(existing.id);
        }

        let counterpart = Counterpart {
            id: CounterpartId::new(),
            tenant_id: tenant_id.clone(),
            address: address.to_string(),
            display_name: display_name.map(str::to_string),
        };
        let id = counterpart.id;
        counterparts.push(counterpart);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    fn outbound(tenant_id: &TenantId, engine_id: &str) -> MessageRecord {
        MessageRecord::outbound(
            tenant_id.clone(),
            None,
            "15551234567",
            "hi",
            EngineMessageId::new(engine_id),
        )
    }

    #[tokio::test]
    async fn status_update_touches_only_matching_record() {
        let store = InMemoryMessageStore::new();
        let t = tenant("u1");
        store.write_message(&outbound(&t, "A")).await.unwrap();
        store.write_message(&outbound(&t, "B")).await.unwrap();

        let updated = store
            .update_message_status(&t, &EngineMessageId::new("B"), DeliveryStatus::Read)
            .await
            .unwrap();

        assert!(updated);
        let messages = store.messages();
        assert_eq!(messages[0].status, DeliveryStatus::Sent);
        assert_eq!(messages[1].status, DeliveryStatus::Read);
    }

    #[tokio::test]
    async fn status_update_for_unknown_id_is_ignored() {
        let store = InMemoryMessageStore::new();
        let t = tenant("u1");
        store.write_message(&outbound(&t, "A")).await.unwrap();

        let updated = store
            .update_message_status(&t, &EngineMessageId::new("Z"), DeliveryStatus::Read)
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn status_update_is_tenant_scoped() {
        let store = InMemoryMessageStore::new();
        store.write_message(&outbound(&tenant("u1"), "A")).await.unwrap();

        let updated = store
            .update_message_status(&tenant("u2"), &EngineMessageId::new("A"), DeliveryStatus::Read)
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn counterparts_are_reused_per_tenant() {
        let store = InMemoryMessageStore::new();
        let a1 = store
            .find_or_create_counterpart(&tenant("u1"), "1555", None)
            .await
            .unwrap();
        let a2 = store
            .find_or_create_counterpart(&tenant("u1"), "1555", Some("Ana"))
            .await
            .unwrap();
        let b = store
            .find_or_create_counterpart(&tenant("u2"), "1555", None)
            .await
            .unwrap();

        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        let named = store
            .counterparts()
            .into_iter()
            .find(|c| c.id == a1)
            .unwrap();
        assert_eq!(named.display_name.as_deref(), Some("Ana"));
    }
}
