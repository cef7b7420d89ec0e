//! PostgreSQL implementation of MessageStore.
//!
//! Messages and counterparts live in two tables; counterparts are unique
//! per `(tenant_id, address)` and resolved with an upsert.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::foundation::{CounterpartId, DomainError, EngineMessageId, TenantId};
use crate::domain::messaging::{DeliveryStatus, MessageRecord};
use crate::ports::MessageStore;

/// PostgreSQL implementation of MessageStore.
#[derive(Clone)]
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    /// Creates a new PostgresMessageStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn write_message(&self, record: &MessageRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO messages (
                id, tenant_id, direction, counterpart_id, counterpart_address,
                content, status, engine_message_id, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.tenant_id.as_str())
        .bind(record.direction.as_str())
        .bind(record.counterpart_id.map(|id| *id.as_uuid()))
        .bind(&record.counterpart_address)
        .bind(&record.content)
        .bind(record.status.as_str())
        .bind(record.engine_message_id.as_ref().map(|id| id.as_str()))
        .bind(record.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to insert message: {}", e))
                .with_detail("tenant_id", record.tenant_id.as_str())
        })?;

        Ok(())
    }

    async fn update_message_status(
        &self,
        tenant_id: &TenantId,
        engine_message_id: &EngineMessageId,
        status: DeliveryStatus,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET status = $3
            WHERE tenant_id = $1 AND engine_message_id = $2
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(engine_message_id.as_str())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update message status: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_or_create_counterpart(
        &self,
        tenant_id: &TenantId,
        address: &str,
        display_name: Option<&str>,
    ) -> Result<CounterpartId, DomainError> {
        let row = sqlx::query(
            r#"
            INSERT INTO counterparts (id, tenant_id, address, display_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, address) DO UPDATE SET
                display_name = COALESCE(counterparts.display_name, EXCLUDED.display_name)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id.as_str())
        .bind(address)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to resolve counterpart: {}", e)))?;

        let id: Uuid = row.get("id");
        Ok(CounterpartId::from_uuid(id))
    }
}
