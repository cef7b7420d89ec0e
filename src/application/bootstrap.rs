//! Bootstrap/restore - reconnect tenants that were connected before a restart.

use futures::future::join_all;
use serde::Serialize;

use crate::domain::foundation::TenantId;
use crate::domain::session::{SessionError, SessionState};

use super::orchestrator::SessionOrchestrator;

/// What happened to each tenant found in the credential store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub restored: Vec<TenantId>,
    pub skipped: Vec<TenantId>,
    pub failed: Vec<TenantId>,
}

impl RestoreReport {
    pub fn total(&self) -> usize {
        self.restored.len() + self.skipped.len() + self.failed.len()
    }
}

enum RestoreOutcome {
    Restored,
    Skipped,
    Failed(SessionError),
}

/// Reconnect every tenant with stored credentials whose last persisted
/// status was `connected`.
///
/// Tenants are restored concurrently; one tenant's failure is logged and
/// does not affect the others.
///
/// # Errors
///
/// - `PersistenceFailure` if the credential store cannot be enumerated
pub async fn restore_sessions(
    orchestrator: &SessionOrchestrator,
) -> Result<RestoreReport, SessionError> {
    let tenants = orchestrator
        .ports()
        .credentials
        .list_tenants()
        .await
        .map_err(|e| SessionError::PersistenceFailure(e.to_string()))?;
    tracing::info!(tenants = tenants.len(), "Restoring sessions");

    let outcomes = join_all(tenants.into_iter().map(|tenant_id| async move {
        let outcome = restore_one(orchestrator, &tenant_id).await;
        (tenant_id, outcome)
    }))
    .await;

    let mut report = RestoreReport::default();
    for (tenant_id, outcome) in outcomes {
        match outcome {
            RestoreOutcome::Restored => report.restored.push(tenant_id),
            RestoreOutcome::Skipped => report.skipped.push(tenant_id),
            RestoreOutcome::Failed(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Session restore failed");
                report.failed.push(tenant_id);
            }
        }
    }

    tracing::info!(
        restored = report.restored.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Session restore finished"
    );
    Ok(report)
}

async fn restore_one(orchestrator: &SessionOrchestrator, tenant_id: &TenantId) -> RestoreOutcome {
    let status = match orchestrator
        .ports()
        .status_store
        .read_session_status(tenant_id)
        .await
    {
        Ok(status) => status,
        Err(e) => return RestoreOutcome::Failed(e.into()),
    };

    match status {
        Some(status) if status.state == SessionState::Connected => {
            match orchestrator.connect(tenant_id).await {
                Ok(outcome) if outcome.success => {
                    tracing::info!(tenant_id = %tenant_id, state = %outcome.session.state, "Session restored");
                    RestoreOutcome::Restored
                }
                Ok(outcome) => RestoreOutcome::Failed(SessionError::EngineTransientFailure(
                    format!("session ended as {}", outcome.session.state),
                )),
                Err(e) => RestoreOutcome::Failed(e),
            }
        }
        _ => {
            tracing::debug!(tenant_id = %tenant_id, "Last status not connected, skipping restore");
            RestoreOutcome::Skipped
        }
    }
}
