//! Session event publisher port.
//!
//! The orchestrator publishes session-scoped events without knowing who,
//! if anyone, is listening.

use async_trait::async_trait;

use crate::domain::foundation::TenantId;
use crate::domain::session::SessionEvent;

/// Port for fanning out session events.
///
/// Implementations must never block on slow subscribers. Delivery is
/// best-effort and at-most-once.
#[async_trait]
pub trait SessionEventPublisher: Send + Sync {
    /// Publish to every subscriber of the tenant.
    ///
    /// Returns the number of subscribers the event was handed to.
    async fn publish(&self, tenant_id: &TenantId, event: SessionEvent) -> usize;
}
