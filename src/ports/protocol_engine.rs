//! Protocol Engine port - the external library speaking the messaging wire protocol.
//!
//! The engine owns pairing, encryption and transport. The gateway only
//! opens connections with a tenant's credentials, consumes the typed event
//! stream each connection produces, and pushes outbound text through it.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::foundation::{EngineMessageId, TenantId};
use crate::domain::messaging::{DeliveryStatus, InboundMessage};
use crate::domain::session::DisconnectReason;

use super::{CredentialBundle, CredentialUpdate};

/// Errors surfaced by the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Network or server trouble; trying again later may work.
    #[error("Transient engine failure: {0}")]
    Transient(String),

    /// The credentials were rejected.
    #[error("Credentials rejected by the engine")]
    Deauthorized,

    /// The connection is already closed.
    #[error("Connection closed")]
    Closed,
}

/// Options passed to the engine for every connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Name shown in the tenant's list of linked devices.
    pub device_name: String,
    pub mark_online_on_connect: bool,
    pub sync_full_history: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            device_name: "Tenant Gateway".to_string(),
            mark_online_on_connect: false,
            sync_full_history: false,
        }
    }
}

/// Everything a live connection reports, in the order the engine raised it.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PairingCode(String),
    ConnectionOpened { identity: Option<String> },
    ConnectionClosed { reason: DisconnectReason },
    MessagesReceived(Vec<InboundMessage>),
    MessageStatus {
        engine_message_id: EngineMessageId,
        status: DeliveryStatus,
    },
    CredentialsUpdated(CredentialUpdate),
}

/// A live connection handle.
///
/// Exactly one exists per session at any time. Dropping the handle without
/// calling [`close`](EngineConnection::close) leaks the engine-side socket.
#[async_trait]
pub trait EngineConnection: Send + Sync {
    /// Send a text message to a fully qualified address.
    async fn send(&self, jid: &str, content: &str) -> Result<EngineMessageId, EngineError>;

    /// Close the underlying socket. Idempotent.
    async fn close(&self);
}

/// Result of opening a connection.
pub struct OpenedConnection {
    pub connection: Box<dyn EngineConnection>,
    pub events: mpsc::Receiver<EngineEvent>,
}

impl std::fmt::Debug for OpenedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedConnection").finish_non_exhaustive()
    }
}

/// Port for opening protocol connections.
#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    /// Open a connection for `tenant_id`.
    ///
    /// Empty credentials start a fresh pairing; otherwise the engine
    /// resumes the existing device registration.
    ///
    /// # Errors
    ///
    /// - `Transient` if the engine could not reach its servers
    /// - `Deauthorized` if the credentials were rejected outright
    async fn open(
        &self,
        tenant_id: &TenantId,
        credentials: CredentialBundle,
        options: &ClientOptions,
    ) -> Result<OpenedConnection, EngineError>;
}
