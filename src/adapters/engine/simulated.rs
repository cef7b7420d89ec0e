//! Simulated protocol engine.
//!
//! Stands in for the real messaging engine during development and tests.
//! Connections behave like real ones from the orchestrator's point of view:
//! fresh credentials produce a pairing code, stored credentials connect
//! straight away, and tests script everything else through the helpers.
//!
//! # Features
//!
//! - Scripted pairing completion, drops, inbound messages and receipts
//! - Error injection for opens and per-destination sends
//! - Handle accounting (opens, live handles, peak live handles)
//! - Send log with timestamps for ordering and pacing checks
//!
//! # Example
//!
//! ```ignore
//! let engine = SimulatedEngine::new();
//! let opened = engine.open(&tenant, CredentialBundle::new(), &options).await?;
//! engine.complete_pairing(&tenant, "15551234567").await;
//! assert_eq!(engine.live_connections(&tenant), 1);
//! ```

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::domain::foundation::{EngineMessageId, TenantId, Timestamp};
use crate::domain::messaging::{bare_address, DeliveryStatus, InboundMessage, MessagePayload};
use crate::domain::session::DisconnectReason;
use crate::ports::{
    ClientOptions, CredentialBundle, CredentialUpdate, EngineConnection, EngineError,
    EngineEvent, OpenedConnection, ProtocolEngine,
};

/// Credential entry holding the paired identity.
pub const IDENTITY_KEY: &str = "creds";

const EVENT_BUFFER: usize = 64;

/// A message accepted by a simulated connection.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub tenant_id: TenantId,
    pub jid: String,
    pub content: String,
    pub engine_message_id: EngineMessageId,
    pub sent_at: Instant,
}

#[derive(Default)]
struct TenantConnections {
    current: Option<(u64, mpsc::Sender<EngineEvent>)>,
    opens: usize,
    live: usize,
    max_live: usize,
    failing_opens: VecDeque<EngineError>,
    revoked: bool,
}

#[derive(Default)]
struct EngineState {
    tenants: HashMap<TenantId, TenantConnections>,
    failing_destinations: HashSet<String>,
    sent: Vec<SentMessage>,
    next_connection_id: u64,
    next_message_id: u64,
}

/// In-process engine with scripted behaviour.
#[derive(Clone, Default)]
pub struct SimulatedEngine {
    state: Arc<Mutex<EngineState>>,
    send_delay: Duration,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send takes this long before it is accepted.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().expect("simulated engine lock poisoned")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scripting
    // ─────────────────────────────────────────────────────────────────────────

    /// Push an arbitrary event onto the tenant's current connection.
    ///
    /// Returns `false` if the tenant has no open connection.
    pub async fn emit(&self, tenant_id: &TenantId, event: EngineEvent) -> bool {
        let sender = self
            .lock()
            .tenants
            .get(tenant_id)
            .and_then(|t| t.current.as_ref().map(|(_, tx)| tx.clone()));
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// The user scanned the pairing code: credentials are issued and the
    /// connection opens.
    pub async fn complete_pairing(&self, tenant_id: &TenantId, identity: &str) -> bool {
        let update = CredentialUpdate::new().set(IDENTITY_KEY, json!({ "me": identity }));
        self.emit(tenant_id, EngineEvent::CredentialsUpdated(update)).await
            && self
                .emit(
                    tenant_id,
                    EngineEvent::ConnectionOpened {
                        identity: Some(identity.to_string()),
                    },
                )
                .await
    }

    /// The remote side closed the connection with this status code.
    pub async fn drop_connection(&self, tenant_id: &TenantId, status_code: u16) -> bool {
        let reason = DisconnectReason::from_status_code(status_code);
        self.emit(tenant_id, EngineEvent::ConnectionClosed { reason })
            .await
    }

    /// Deliver a plain text message from `from_digits`.
    pub async fn deliver_text(&self, tenant_id: &TenantId, from_digits: &str, text: &str) -> bool {
        let id = self.next_message_id();
        let message = InboundMessage {
            engine_message_id: id,
            remote_jid: format!("{}@s.whatsapp.net", from_digits),
            from_me: false,
            push_name: None,
            timestamp: Timestamp::now(),
            payload: MessagePayload::Text {
                text: text.to_string(),
            },
        };
        self.emit(tenant_id, EngineEvent::MessagesReceived(vec![message]))
            .await
    }

    /// Report a delivery receipt for a previously sent message.
    pub async fn report_status(
        &self,
        tenant_id: &TenantId,
        engine_message_id: EngineMessageId,
        status: DeliveryStatus,
    ) -> bool {
        self.emit(
            tenant_id,
            EngineEvent::MessageStatus {
                engine_message_id,
                status,
            },
        )
        .await
    }

    /// Sends to this destination (digits or full address) fail transiently.
    pub fn fail_destination(&self, destination: &str) {
        self.lock()
            .failing_destinations
            .insert(bare_address(destination).to_string());
    }

    /// Every send on the tenant's connections is rejected as deauthorized.
    pub fn revoke_credentials(&self, tenant_id: &TenantId) {
        self.lock()
            .tenants
            .entry(tenant_id.clone())
            .or_default()
            .revoked = true;
    }

    /// The tenant's next `count` opens fail with `error`.
    pub fn fail_next_opens(&self, tenant_id: &TenantId, count: usize, error: EngineError) {
        let mut state = self.lock();
        let tenant = state.tenants.entry(tenant_id.clone()).or_default();
        tenant
            .failing_opens
            .extend(std::iter::repeat(error).take(count));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accounting
    // ─────────────────────────────────────────────────────────────────────────

    /// Total successful opens for the tenant.
    pub fn open_count(&self, tenant_id: &TenantId) -> usize {
        self.lock().tenants.get(tenant_id).map_or(0, |t| t.opens)
    }

    /// Handles opened and not yet closed.
    pub fn live_connections(&self, tenant_id: &TenantId) -> usize {
        self.lock().tenants.get(tenant_id).map_or(0, |t| t.live)
    }

    /// Highest number of simultaneously live handles ever seen.
    pub fn max_live_connections(&self, tenant_id: &TenantId) -> usize {
        self.lock().tenants.get(tenant_id).map_or(0, |t| t.max_live)
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.lock().sent.clone()
    }

    fn next_message_id(&self) -> EngineMessageId {
        let mut state = self.lock();
        state.next_message_id += 1;
        EngineMessageId::new(format!("SIM{:012}", state.next_message_id))
    }
}

#[async_trait]
impl ProtocolEngine for SimulatedEngine {
    async fn open(
        &self,
        tenant_id: &TenantId,
        credentials: CredentialBundle,
        options: &ClientOptions,
    ) -> Result<OpenedConnection, EngineError> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let connection_id = {
            let mut state = self.lock();
            state.next_connection_id += 1;
            let connection_id = state.next_connection_id;

            let tenant = state.tenants.entry(tenant_id.clone()).or_default();
            if let Some(error) = tenant.failing_opens.pop_front() {
                return Err(error);
            }
            tenant.opens += 1;
            tenant.live += 1;
            tenant.max_live = tenant.max_live.max(tenant.live);
            tenant.current = Some((connection_id, tx.clone()));
            connection_id
        };

        let first_event = if credentials.is_empty() {
            EngineEvent::PairingCode(format!("2@{}-{}", tenant_id, connection_id))
        } else {
            let identity = credentials
                .get(IDENTITY_KEY)
                .and_then(|creds| creds.get("me"))
                .and_then(|me| me.as_str())
                .map(str::to_string);
            EngineEvent::ConnectionOpened { identity }
        };
        // Fresh channel with spare capacity; cannot be full.
        let _ = tx.try_send(first_event);

        tracing::debug!(
            tenant_id = %tenant_id,
            connection_id,
            device = %options.device_name,
            "Simulated connection opened"
        );

        Ok(OpenedConnection {
            connection: Box::new(SimulatedConnection {
                tenant_id: tenant_id.clone(),
                connection_id,
                engine: self.clone(),
                closed: AtomicBool::new(false),
            }),
            events: rx,
        })
    }
}

struct SimulatedConnection {
    tenant_id: TenantId,
    connection_id: u64,
    engine: SimulatedEngine,
    closed: AtomicBool,
}

#[async_trait]
impl EngineConnection for SimulatedConnection {
    async fn send(&self, jid: &str, content: &str) -> Result<EngineMessageId, EngineError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::Closed);
        }
        if !self.engine.send_delay.is_zero() {
            tokio::time::sleep(self.engine.send_delay).await;
        }

        let sent_at = Instant::now();
        let engine_message_id = self.engine.next_message_id();
        let mut state = self.engine.lock();
        if state
            .tenants
            .get(&self.tenant_id)
            .is_some_and(|tenant| tenant.revoked)
        {
            return Err(EngineError::Deauthorized);
        }
        if state.failing_destinations.contains(bare_address(jid)) {
            return Err(EngineError::Transient(format!("delivery to {} failed", jid)));
        }
        state.sent.push(SentMessage {
            tenant_id: self.tenant_id.clone(),
            jid: jid.to_string(),
            content: content.to_string(),
            engine_message_id: engine_message_id.clone(),
            sent_at,
        });
        Ok(engine_message_id)
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut state = self.engine.lock();
        if let Some(tenant) = state.tenants.get_mut(&self.tenant_id) {
            tenant.live = tenant.live.saturating_sub(1);
            if matches!(tenant.current, Some((id, _)) if id == self.connection_id) {
                tenant.current = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::new("u1").unwrap()
    }

    fn paired_credentials(identity: &str) -> CredentialBundle {
        let mut bundle = CredentialBundle::new();
        bundle.apply(&CredentialUpdate::new().set(IDENTITY_KEY, json!({ "me": identity })));
        bundle
    }

    #[tokio::test]
    async fn fresh_credentials_start_with_pairing_code() {
        let engine = SimulatedEngine::new();
        let mut opened = engine
            .open(&tenant(), CredentialBundle::new(), &ClientOptions::default())
            .await
            .unwrap();

        match opened.events.recv().await {
            Some(EngineEvent::PairingCode(code)) => assert!(code.starts_with("2@u1-")),
            other => panic!("expected pairing code, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn stored_credentials_connect_immediately() {
        let engine = SimulatedEngine::new();
        let mut opened = engine
            .open(&tenant(), paired_credentials("1555"), &ClientOptions::default())
            .await
            .unwrap();

        assert_eq!(
            opened.events.recv().await,
            Some(EngineEvent::ConnectionOpened {
                identity: Some("1555".into())
            })
        );
    }

    #[tokio::test]
    async fn complete_pairing_emits_credentials_then_open() {
        let engine = SimulatedEngine::new();
        let mut opened = engine
            .open(&tenant(), CredentialBundle::new(), &ClientOptions::default())
            .await
            .unwrap();
        opened.events.recv().await;

        assert!(engine.complete_pairing(&tenant(), "1555").await);
        assert!(matches!(
            opened.events.recv().await,
            Some(EngineEvent::CredentialsUpdated(_))
        ));
        assert!(matches!(
            opened.events.recv().await,
            Some(EngineEvent::ConnectionOpened { .. })
        ));
    }

    #[tokio::test]
    async fn close_releases_live_handle() {
        let engine = SimulatedEngine::new();
        let opened = engine
            .open(&tenant(), CredentialBundle::new(), &ClientOptions::default())
            .await
            .unwrap();
        assert_eq!(engine.live_connections(&tenant()), 1);

        opened.connection.close().await;
        opened.connection.close().await;
        assert_eq!(engine.live_connections(&tenant()), 0);
        assert_eq!(engine.open_count(&tenant()), 1);
        assert!(!engine.emit(&tenant(), EngineEvent::PairingCode("x".into())).await);
    }

    #[tokio::test]
    async fn injected_open_failures_are_consumed_in_order() {
        let engine = SimulatedEngine::new();
        engine.fail_next_opens(&tenant(), 1, EngineError::Transient("down".into()));

        let first = engine
            .open(&tenant(), CredentialBundle::new(), &ClientOptions::default())
            .await;
        assert!(matches!(first, Err(EngineError::Transient(_))));

        let second = engine
            .open(&tenant(), CredentialBundle::new(), &ClientOptions::default())
            .await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn send_records_message_and_honours_failures() {
        let engine = SimulatedEngine::new();
        let opened = engine
            .open(&tenant(), paired_credentials("1555"), &ClientOptions::default())
            .await
            .unwrap();
        engine.fail_destination("2222222222");

        let id = opened
            .connection
            .send("1111111111@s.whatsapp.net", "hi")
            .await
            .unwrap();
        let failed = opened
            .connection
            .send("2222222222@s.whatsapp.net", "hi")
            .await;

        assert!(matches!(failed, Err(EngineError::Transient(_))));
        let sent = engine.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].engine_message_id, id);
    }

    #[tokio::test]
    async fn revoked_tenant_sends_are_deauthorized() {
        let engine = SimulatedEngine::new();
        let opened = engine
            .open(&tenant(), paired_credentials("1555"), &ClientOptions::default())
            .await
            .unwrap();
        engine.revoke_credentials(&tenant());

        let result = opened.connection.send("1111111111@s.whatsapp.net", "hi").await;
        assert_eq!(result, Err(EngineError::Deauthorized));
        assert!(engine.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let engine = SimulatedEngine::new();
        let opened = engine
            .open(&tenant(), paired_credentials("1555"), &ClientOptions::default())
            .await
            .unwrap();
        opened.connection.close().await;

        let result = opened.connection.send("1111111111@s.whatsapp.net", "hi").await;
        assert_eq!(result, Err(EngineError::Closed));
    }
}
