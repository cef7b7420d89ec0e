//! PostgreSQL implementation of SessionStatusStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::domain::session::SessionState;
use crate::ports::{PersistedSessionStatus, SessionStatusStore};

/// PostgreSQL implementation of SessionStatusStore.
#[derive(Clone)]
pub struct PostgresSessionStatusStore {
    pool: PgPool,
}

impl PostgresSessionStatusStore {
    /// Creates a new PostgresSessionStatusStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStatusStore for PostgresSessionStatusStore {
    async fn write_session_status(
        &self,
        status: &PersistedSessionStatus,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO session_status (tenant_id, state, identity, last_activity, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (tenant_id) DO UPDATE SET
                state = EXCLUDED.state,
                identity = EXCLUDED.identity,
                last_activity = EXCLUDED.last_activity,
                updated_at = now()
            "#,
        )
        .bind(status.tenant_id.as_str())
        .bind(status.state.as_str())
        .bind(status.identity.as_deref())
        .bind(status.last_activity.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to write session status: {}", e))
                .with_detail("tenant_id", status.tenant_id.as_str())
        })?;

        Ok(())
    }

    async fn read_session_status(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<PersistedSessionStatus>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT tenant_id, state, identity, last_activity
            FROM session_status
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to read session status: {}", e)))?;

        match row {
            Some(row) => {
                let state: String = row.get("state");
                let last_activity: DateTime<Utc> = row.get("last_activity");
                Ok(Some(PersistedSessionStatus {
                    tenant_id: tenant_id.clone(),
                    state: state.parse::<SessionState>()?,
                    identity: row.get("identity"),
                    last_activity: Timestamp::from_datetime(last_activity),
                }))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresSessionStatusStore>();
    }
}
