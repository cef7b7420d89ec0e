//! Session orchestrator - the public face of the gateway.
//!
//! Every tenant's session is owned by one [`SessionWorker`](worker) task.
//! The orchestrator finds or spawns that worker through the
//! [`SessionRegistry`] and talks to it over its command channel; status
//! reads come straight from the worker's published snapshot.
//!
//! ```text
//! HTTP / WebSocket ──► SessionOrchestrator ──► SessionRegistry
//!                            │                      │ handle
//!                            │ bulk jobs            ▼
//!                            └──► OutboundQueue ──► SessionWorker ◄── engine events
//!                                                   │
//!                                                   ├──► CredentialStore
//!                                                   ├──► SessionStatusStore / MessageStore
//!                                                   └──► SessionEventPublisher
//! ```

mod outbound;
mod registry;
mod worker;

pub use outbound::{BulkReport, BulkResult, OutboundQueue};
pub use registry::{Registration, SessionHandle, SessionRegistry};

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;

use crate::config::AppConfig;
use crate::domain::foundation::{EngineMessageId, TenantId};
use crate::domain::messaging::Destination;
use crate::domain::session::{ReconnectPolicy, SessionError, SessionSnapshot, SessionState};
use crate::ports::{
    ClientOptions, CredentialStore, MessageStore, PersistedSessionStatus, ProtocolEngine,
    SessionEventPublisher, SessionStatusStore,
};

use worker::SessionWorker;

/// Collaborators shared by every session worker.
#[derive(Clone)]
pub struct SessionPorts {
    pub engine: Arc<dyn ProtocolEngine>,
    pub credentials: Arc<dyn CredentialStore>,
    pub status_store: Arc<dyn SessionStatusStore>,
    pub message_store: Arc<dyn MessageStore>,
    pub publisher: Arc<dyn SessionEventPublisher>,
}

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub reconnect_policy: ReconnectPolicy,
    pub client_options: ClientOptions,
    /// How long connect waits for a pairing code or an open connection.
    pub pairing_wait: Duration,
    pub default_bulk_delay: Duration,
    pub max_bulk_delay: Duration,
    pub max_bulk_destinations: usize,
    /// Queued commands per session, and queued bulk jobs per tenant.
    pub queue_depth: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            reconnect_policy: ReconnectPolicy::default(),
            client_options: ClientOptions::default(),
            pairing_wait: Duration::from_secs(20),
            default_bulk_delay: Duration::from_millis(1_000),
            max_bulk_delay: Duration::from_millis(60_000),
            max_bulk_destinations: 500,
            queue_depth: 16,
        }
    }
}

impl From<&AppConfig> for OrchestratorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            reconnect_policy: config.reconnect.policy(),
            client_options: ClientOptions::default(),
            pairing_wait: config.messaging.pairing_wait(),
            default_bulk_delay: config.messaging.default_bulk_delay(),
            max_bulk_delay: Duration::from_millis(config.messaging.max_bulk_delay_ms),
            max_bulk_destinations: config.messaging.max_bulk_destinations,
            queue_depth: config.messaging.outbound_queue_depth,
        }
    }
}

/// Result of a connect request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectOutcome {
    pub success: bool,
    /// A live session already existed; no new connection was attempted.
    pub already_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
    pub session: SessionSnapshot,
}

impl ConnectOutcome {
    fn from_snapshot(session: SessionSnapshot, already_connected: bool) -> Self {
        Self {
            success: !session.is_terminated(),
            already_connected,
            pairing_code: session.pairing_code.clone(),
            session,
        }
    }
}

/// Bulk send request after HTTP decoding.
#[derive(Debug, Clone)]
pub struct BulkSendRequest {
    pub destinations: Vec<String>,
    pub content: String,
    /// `None` uses the configured default.
    pub delay: Option<Duration>,
}

/// Session counts by state, for health reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounts {
    pub total: usize,
    pub pairing: usize,
    pub connected: usize,
    pub reconnecting: usize,
}

/// Creates, tracks, tears down and routes traffic through tenant sessions.
pub struct SessionOrchestrator {
    ports: SessionPorts,
    config: OrchestratorConfig,
    registry: Arc<SessionRegistry>,
    outbound: OutboundQueue,
}

impl SessionOrchestrator {
    pub fn new(ports: SessionPorts, config: OrchestratorConfig) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let outbound = OutboundQueue::new(Arc::clone(&registry), config.queue_depth);
        Self {
            ports,
            config,
            registry,
            outbound,
        }
    }

    pub fn ports(&self) -> &SessionPorts {
        &self.ports
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Connect the tenant, or report the session that already exists.
    ///
    /// A new session waits up to `pairing_wait` for the engine to produce a
    /// pairing code or open the connection. Timing out is not an error; the
    /// outcome then simply carries no pairing code yet.
    ///
    /// # Errors
    ///
    /// - `Deauthorized` if the engine rejected stored credentials outright
    /// - `EngineTransientFailure` if the first connection could not be opened
    pub async fn connect(&self, tenant_id: &TenantId) -> Result<ConnectOutcome, SessionError> {
        let registration = self.registry.get_or_create(tenant_id, |worker_id| {
            SessionWorker::new(
                tenant_id.clone(),
                worker_id,
                self.ports.clone(),
                self.config.reconnect_policy.clone(),
                self.config.client_options.clone(),
                Arc::clone(&self.registry),
                self.config.queue_depth,
            )
        });

        let (handle, ready) = match registration {
            Registration::Existing(handle) => {
                tracing::debug!(tenant_id = %tenant_id, "Connect for existing session");
                return Ok(ConnectOutcome::from_snapshot(handle.snapshot(), true));
            }
            Registration::Created(handle, (worker, ready)) => {
                tokio::spawn(worker.run());
                (handle, ready)
            }
        };

        ready
            .await
            .map_err(|_| SessionError::internal("session worker exited before opening"))??;

        let mut updates = handle.watch();
        let timed_out = tokio::time::timeout(
            self.config.pairing_wait,
            updates.wait_for(|s| s.pairing_code.is_some() || s.connected || s.is_terminated()),
        )
        .await
        .is_err();
        if timed_out {
            tracing::debug!(tenant_id = %tenant_id, "No pairing code yet");
        }

        let snapshot = updates.borrow().clone();
        tracing::info!(
            tenant_id = %tenant_id,
            state = %snapshot.state,
            pairing = snapshot.pairing_code.is_some(),
            "Connect requested"
        );
        Ok(ConnectOutcome::from_snapshot(snapshot, false))
    }

    /// Tear the tenant's session down and purge its credentials.
    ///
    /// Also succeeds when no session is live, so stale credentials left by
    /// a crashed process can be cleared.
    pub async fn disconnect(&self, tenant_id: &TenantId) -> Result<(), SessionError> {
        if let Some(handle) = self.registry.get(tenant_id) {
            if handle.disconnect().await {
                return Ok(());
            }
        }

        self.ports
            .credentials
            .purge(tenant_id)
            .await
            .map_err(|e| SessionError::PersistenceFailure(e.to_string()))?;
        if let Err(e) = self
            .ports
            .status_store
            .write_session_status(&PersistedSessionStatus::terminated(tenant_id.clone()))
            .await
        {
            tracing::warn!(tenant_id = %tenant_id, error = %e, "Failed to persist session status");
        }
        tracing::info!(tenant_id = %tenant_id, "Disconnected tenant without live session");
        Ok(())
    }

    /// Current status. Tenants without a live session report `terminated`.
    pub fn status(&self, tenant_id: &TenantId) -> SessionSnapshot {
        self.registry
            .get(tenant_id)
            .map(|handle| handle.snapshot())
            .unwrap_or_else(|| SessionSnapshot::absent(tenant_id.clone()))
    }

    /// Send one text message.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for empty content
    /// - `InvalidDestination` if the address cannot be normalized
    /// - `NotConnected` if the tenant has no connected session
    /// - `EngineTransientFailure` if the engine refused the message
    pub async fn send(
        &self,
        tenant_id: &TenantId,
        destination: &str,
        content: &str,
    ) -> Result<EngineMessageId, SessionError> {
        validate_content(content)?;
        let destination = Destination::parse(destination)?;
        let handle = self
            .registry
            .get(tenant_id)
            .ok_or_else(|| SessionError::NotConnected(tenant_id.clone()))?;
        handle.send(destination, content.to_string()).await
    }

    /// Send one message to many destinations, one after another.
    ///
    /// Individual failures are reported per destination and do not stop
    /// the job.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for empty content, no destinations, too many
    ///   destinations or a delay above the maximum
    /// - `NotConnected` if the tenant has no connected session
    pub async fn send_bulk(
        &self,
        tenant_id: &TenantId,
        request: BulkSendRequest,
    ) -> Result<BulkReport, SessionError> {
        validate_content(&request.content)?;
        if request.destinations.is_empty() {
            return Err(SessionError::validation(
                "destinations",
                "at least one destination is required",
            ));
        }
        if request.destinations.len() > self.config.max_bulk_destinations {
            return Err(SessionError::validation(
                "destinations",
                format!(
                    "at most {} destinations per request",
                    self.config.max_bulk_destinations
                ),
            ));
        }
        let delay = request.delay.unwrap_or(self.config.default_bulk_delay);
        if delay > self.config.max_bulk_delay {
            return Err(SessionError::validation(
                "delay_ms",
                format!(
                    "must be at most {} ms",
                    self.config.max_bulk_delay.as_millis()
                ),
            ));
        }
        if !self.status(tenant_id).connected {
            return Err(SessionError::NotConnected(tenant_id.clone()));
        }

        tracing::info!(
            tenant_id = %tenant_id,
            destinations = request.destinations.len(),
            delay_ms = delay.as_millis() as u64,
            "Bulk send queued"
        );
        self.outbound
            .submit(tenant_id, request.destinations, request.content, delay)
            .await
    }

    /// Snapshots of every live session, ordered by tenant.
    pub fn list_sessions(&self) -> Vec<SessionSnapshot> {
        self.registry.list()
    }

    pub fn session_counts(&self) -> SessionCounts {
        self.registry
            .list()
            .iter()
            .fold(SessionCounts::default(), |mut counts, snapshot| {
                counts.total += 1;
                match snapshot.state {
                    SessionState::Pairing => counts.pairing += 1,
                    SessionState::Connected => counts.connected += 1,
                    SessionState::Reconnecting => counts.reconnecting += 1,
                    SessionState::Terminated => {}
                }
                counts
            })
    }

    /// Close every session, keeping credentials and persisted status so a
    /// restarted process restores them.
    pub async fn shutdown(&self) {
        let handles = self.registry.handles();
        tracing::info!(sessions = handles.len(), "Shutting down sessions");
        join_all(handles.iter().map(SessionHandle::shutdown)).await;
    }
}

fn validate_content(content: &str) -> Result<(), SessionError> {
    if content.trim().is_empty() {
        return Err(SessionError::validation("content", "content cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::engine::SimulatedEngine;
    use crate::adapters::storage::{
        InMemoryCredentialStore, InMemoryMessageStore, InMemorySessionStatusStore,
    };
    use crate::adapters::websocket::RoomManager;

    fn orchestrator() -> SessionOrchestrator {
        let ports = SessionPorts {
            engine: Arc::new(SimulatedEngine::new()),
            credentials: Arc::new(InMemoryCredentialStore::new()),
            status_store: Arc::new(InMemorySessionStatusStore::new()),
            message_store: Arc::new(InMemoryMessageStore::new()),
            publisher: Arc::new(RoomManager::with_default_capacity()),
        };
        SessionOrchestrator::new(ports, OrchestratorConfig::default())
    }

    fn tenant() -> TenantId {
        TenantId::new("u1").unwrap()
    }

    #[test]
    fn status_of_unknown_tenant_is_absent() {
        let snapshot = orchestrator().status(&tenant());
        assert!(!snapshot.connected);
        assert_eq!(snapshot.state, SessionState::Terminated);
    }

    #[tokio::test]
    async fn send_rejects_empty_content_before_lookup() {
        let err = orchestrator()
            .send(&tenant(), "15551234567", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::ValidationFailed { ref field, .. } if field == "content"));
    }

    #[tokio::test]
    async fn send_rejects_bad_destination() {
        let err = orchestrator()
            .send(&tenant(), "abc", "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidDestination { .. }));
    }

    #[tokio::test]
    async fn send_without_session_is_not_connected() {
        let err = orchestrator()
            .send(&tenant(), "15551234567", "hi")
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::NotConnected(tenant()));
    }

    #[tokio::test]
    async fn send_bulk_validates_limits() {
        let orchestrator = orchestrator();
        let request = |destinations: Vec<String>, delay_ms: u64| BulkSendRequest {
            destinations,
            content: "hi".into(),
            delay: Some(Duration::from_millis(delay_ms)),
        };

        let empty = orchestrator.send_bulk(&tenant(), request(vec![], 0)).await;
        assert!(matches!(empty, Err(SessionError::ValidationFailed { .. })));

        let too_many = orchestrator
            .send_bulk(&tenant(), request(vec!["15551234567".into(); 501], 0))
            .await;
        assert!(matches!(too_many, Err(SessionError::ValidationFailed { .. })));

        let too_slow = orchestrator
            .send_bulk(&tenant(), request(vec!["15551234567".into()], 60_001))
            .await;
        assert!(matches!(too_slow, Err(SessionError::ValidationFailed { ref field, .. }) if field == "delay_ms"));

        let not_connected = orchestrator
            .send_bulk(&tenant(), request(vec!["15551234567".into()], 0))
            .await;
        assert_eq!(not_connected.unwrap_err(), SessionError::NotConnected(tenant()));
    }

    #[tokio::test]
    async fn connect_without_credentials_returns_pairing_code() {
        let orchestrator = orchestrator();

        let outcome = orchestrator.connect(&tenant()).await.unwrap();

        assert!(outcome.success);
        assert!(!outcome.already_connected);
        assert!(outcome.pairing_code.is_some());
        assert!(!outcome.session.connected);
        assert_eq!(orchestrator.session_counts().pairing, 1);
    }
}
