//! Session worker - the single thread of control for one tenant.
//!
//! Engine events, caller commands and the reconnect timer all arrive in
//! one `select!` loop, so the [`Session`] it owns is never shared and
//! events are applied in the order the engine raised them.

use std::future::pending;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};

use crate::domain::foundation::{EngineMessageId, TenantId};
use crate::domain::messaging::{bare_address, DeliveryStatus, Destination, InboundMessage, MessageRecord};
use crate::domain::session::{
    DisconnectReason, GiveUpReason, ReconnectDecision, ReconnectPolicy, Session, SessionError,
    SessionEvent, SessionSnapshot,
};
use crate::ports::{
    ClientOptions, CredentialBundle, CredentialUpdate, EngineConnection, EngineError, EngineEvent,
    PersistedSessionStatus,
};

use super::registry::{SessionCommand, SessionHandle, SessionRegistry};
use super::SessionPorts;

/// Outcome of the worker's first `open`, reported to the caller of connect.
pub(crate) type ReadySignal = oneshot::Receiver<Result<(), SessionError>>;

pub(crate) struct SessionWorker {
    worker_id: u64,
    session: Session,
    ports: SessionPorts,
    policy: ReconnectPolicy,
    client_options: ClientOptions,
    registry: Arc<SessionRegistry>,
    snapshot: watch::Sender<SessionSnapshot>,
    commands: mpsc::Receiver<SessionCommand>,
    ready: Option<oneshot::Sender<Result<(), SessionError>>>,
    connection: Option<Box<dyn EngineConnection>>,
    events: Option<mpsc::Receiver<EngineEvent>>,
    reconnect_at: Option<Instant>,
    stopping: bool,
}

impl SessionWorker {
    /// Build a worker and the handle callers use to reach it.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        tenant_id: TenantId,
        worker_id: u64,
        ports: SessionPorts,
        policy: ReconnectPolicy,
        client_options: ClientOptions,
        registry: Arc<SessionRegistry>,
        command_buffer: usize,
    ) -> (SessionHandle, (SessionWorker, ReadySignal)) {
        let session = Session::new(tenant_id.clone());
        let (command_tx, command_rx) = mpsc::channel(command_buffer.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
        let (ready_tx, ready_rx) = oneshot::channel();

        let handle = SessionHandle::new(tenant_id, worker_id, command_tx, snapshot_rx);
        let worker = SessionWorker {
            worker_id,
            session,
            ports,
            policy,
            client_options,
            registry,
            snapshot: snapshot_tx,
            commands: command_rx,
            ready: Some(ready_tx),
            connection: None,
            events: None,
            reconnect_at: None,
            stopping: false,
        };
        (handle, (worker, ready_rx))
    }

    fn tenant_id(&self) -> TenantId {
        self.session.tenant_id().clone()
    }

    /// Open the first connection, then process until the session ends.
    pub(crate) async fn run(mut self) {
        let tenant_id = self.tenant_id();
        tracing::info!(tenant_id = %tenant_id, worker_id = self.worker_id, "Session worker started");

        if let Err(error) = self.open_connection().await {
            let failure = self.fail_initial_open(error).await;
            if let Some(ready) = self.ready.take() {
                let _ = ready.send(Err(failure));
            }
            self.registry.remove(&tenant_id, self.worker_id);
            return;
        }
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Ok(()));
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.release_connection().await;
                        break;
                    }
                },
                event = next_event(&mut self.events) => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        tracing::warn!(tenant_id = %tenant_id, "Engine event stream ended without close");
                        self.handle_close(DisconnectReason::ConnectionLost).await;
                    }
                },
                _ = reconnect_timer(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.reconnect().await;
                }
            }

            if self.session.is_terminated() || self.stopping {
                break;
            }
        }

        self.registry.remove(&tenant_id, self.worker_id);
        tracing::info!(
            tenant_id = %tenant_id,
            worker_id = self.worker_id,
            state = %self.session.state(),
            "Session worker stopped"
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Send {
                destination,
                content,
                reply,
            } => {
                let result = self.send(destination, content).await;
                let _ = reply.send(result);
            }
            SessionCommand::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            SessionCommand::Shutdown { reply } => {
                self.reconnect_at = None;
                self.release_connection().await;
                self.registry.remove(self.session.tenant_id(), self.worker_id);
                self.stopping = true;
                tracing::debug!(tenant_id = %self.session.tenant_id(), "Session worker shutting down");
                let _ = reply.send(());
            }
        }
    }

    async fn send(
        &mut self,
        destination: Destination,
        content: String,
    ) -> Result<EngineMessageId, SessionError> {
        let tenant_id = self.tenant_id();
        let connection = match (&self.connection, self.session.is_connected()) {
            (Some(connection), true) => connection,
            _ => return Err(SessionError::NotConnected(tenant_id)),
        };

        let sent = connection.send(&destination.jid(), &content).await;
        let engine_message_id = match sent {
            Ok(id) => id,
            Err(EngineError::Transient(message)) => {
                return Err(SessionError::EngineTransientFailure(message))
            }
            Err(EngineError::Closed) => return Err(SessionError::NotConnected(tenant_id)),
            Err(EngineError::Deauthorized) => {
                tracing::warn!(tenant_id = %tenant_id, "Send rejected, credentials revoked");
                self.handle_close(DisconnectReason::LoggedOut).await;
                return Err(SessionError::Deauthorized(tenant_id));
            }
        };

        self.session.touch();
        self.publish_snapshot();

        let counterpart_id = match self
            .ports
            .message_store
            .find_or_create_counterpart(&tenant_id, destination.address(), None)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Counterpart lookup failed");
                None
            }
        };
        let record = MessageRecord::outbound(
            tenant_id.clone(),
            counterpart_id,
            destination.address(),
            content,
            engine_message_id.clone(),
        );
        if let Err(e) = self.ports.message_store.write_message(&record).await {
            tracing::warn!(
                tenant_id = %tenant_id,
                engine_message_id = %engine_message_id,
                error = %e,
                "Failed to persist outbound message"
            );
        }

        Ok(engine_message_id)
    }

    async fn disconnect(&mut self) {
        let tenant_id = self.tenant_id();
        self.reconnect_at = None;
        self.release_connection().await;
        self.purge_credentials().await;

        if self.session.terminate().is_ok() {
            self.after_transition().await;
        }
        self.registry.remove(&tenant_id, self.worker_id);
        tracing::info!(tenant_id = %tenant_id, "Session disconnected");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Engine events
    // ─────────────────────────────────────────────────────────────────────────

    async fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::PairingCode(code) => self.on_pairing_code(code).await,
            EngineEvent::ConnectionOpened { identity } => self.on_opened(identity).await,
            EngineEvent::ConnectionClosed { reason } => self.handle_close(reason).await,
            EngineEvent::MessagesReceived(messages) => {
                for message in messages {
                    self.on_inbound(message).await;
                }
            }
            EngineEvent::MessageStatus {
                engine_message_id,
                status,
            } => self.on_message_status(engine_message_id, status).await,
            EngineEvent::CredentialsUpdated(update) => self.on_credentials_updated(update).await,
        }
    }

    async fn on_pairing_code(&mut self, code: String) {
        if let Err(e) = self.session.issue_pairing_code(code.clone()) {
            tracing::debug!(tenant_id = %self.session.tenant_id(), error = %e, "Ignoring pairing code");
            return;
        }
        self.publish_snapshot();
        self.ports
            .publisher
            .publish(self.session.tenant_id(), SessionEvent::PairingCodeIssued { code })
            .await;
    }

    async fn on_opened(&mut self, identity: Option<String>) {
        let identity = identity.map(|id| bare_address(&id).to_string());
        if let Err(e) = self.session.mark_connected(identity) {
            tracing::warn!(tenant_id = %self.session.tenant_id(), error = %e, "Unexpected connection open");
            return;
        }
        tracing::info!(
            tenant_id = %self.session.tenant_id(),
            identity = ?self.session.identity(),
            "Session connected"
        );
        self.after_transition().await;
    }

    async fn handle_close(&mut self, reason: DisconnectReason) {
        let tenant_id = self.tenant_id();
        self.release_connection().await;

        match self.policy.decide(reason, self.session.reconnect_attempts()) {
            ReconnectDecision::RetryAfter(delay) => {
                let attempt = match self.session.begin_reconnect() {
                    Ok(attempt) => attempt,
                    Err(e) => {
                        tracing::warn!(tenant_id = %tenant_id, error = %e, "Cannot schedule reconnect");
                        return;
                    }
                };
                tracing::info!(
                    tenant_id = %tenant_id,
                    %reason,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Connection closed, reconnect scheduled"
                );
                self.reconnect_at = Some(Instant::now() + delay);
                self.after_transition().await;
            }
            ReconnectDecision::GiveUp(give_up) => {
                if give_up == GiveUpReason::Deauthorized {
                    self.purge_credentials().await;
                }
                tracing::warn!(
                    tenant_id = %tenant_id,
                    %reason,
                    attempts = self.session.reconnect_attempts(),
                    give_up = ?give_up,
                    "Connection closed for good"
                );
                if self.session.terminate().is_ok() {
                    self.after_transition().await;
                }
            }
        }
    }

    async fn on_inbound(&mut self, message: InboundMessage) {
        let tenant_id = self.tenant_id();
        if !self.session.is_connected() {
            tracing::debug!(tenant_id = %tenant_id, "Dropping message received while not connected");
            return;
        }
        let Some(text) = message.extract_text() else {
            tracing::trace!(tenant_id = %tenant_id, "No extractable content");
            return;
        };
        let address = message.sender().to_string();
        let content = text.to_string();

        let store = &self.ports.message_store;
        let counterpart_id = match store
            .find_or_create_counterpart(&tenant_id, &address, message.push_name.as_deref())
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Counterpart lookup failed");
                None
            }
        };
        let record = MessageRecord::inbound(
            tenant_id.clone(),
            counterpart_id,
            address.clone(),
            content.clone(),
            message.engine_message_id.clone(),
            message.timestamp,
        );
        if let Err(e) = store.write_message(&record).await {
            tracing::warn!(
                tenant_id = %tenant_id,
                engine_message_id = %message.engine_message_id,
                error = %e,
                "Failed to persist inbound message"
            );
        }

        self.session.touch();
        self.publish_snapshot();
        self.ports
            .publisher
            .publish(
                &tenant_id,
                SessionEvent::MessageReceived {
                    from: address,
                    content,
                    timestamp: message.timestamp,
                },
            )
            .await;
    }

    async fn on_message_status(&mut self, engine_message_id: EngineMessageId, status: DeliveryStatus) {
        let tenant_id = self.tenant_id();
        match self
            .ports
            .message_store
            .update_message_status(&tenant_id, &engine_message_id, status)
            .await
        {
            Ok(true) => {
                tracing::debug!(tenant_id = %tenant_id, %engine_message_id, %status, "Delivery status updated")
            }
            Ok(false) => {
                tracing::trace!(tenant_id = %tenant_id, %engine_message_id, "Status for unknown message")
            }
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, %engine_message_id, error = %e, "Failed to update delivery status")
            }
        }
    }

    async fn on_credentials_updated(&mut self, update: CredentialUpdate) {
        let tenant_id = self.tenant_id();
        if let Err(e) = self.ports.credentials.persist(&tenant_id, &update).await {
            tracing::error!(tenant_id = %tenant_id, error = %e, "Failed to persist credentials");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connection lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a brand-new handle with whatever credentials are stored now.
    async fn open_connection(&mut self) -> Result<(), EngineError> {
        let tenant_id = self.tenant_id();
        self.release_connection().await;

        let credentials = match self.ports.credentials.load(&tenant_id).await {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Credentials unreadable, pairing afresh");
                CredentialBundle::new()
            }
        };
        let resuming = !credentials.is_empty();

        let opened = self
            .ports
            .engine
            .open(&tenant_id, credentials, &self.client_options)
            .await?;
        tracing::debug!(tenant_id = %tenant_id, resuming, "Engine connection opened");

        self.connection = Some(opened.connection);
        self.events = Some(opened.events);
        Ok(())
    }

    async fn reconnect(&mut self) {
        let tenant_id = self.tenant_id();
        if let Err(e) = self.session.resume_pairing() {
            tracing::warn!(tenant_id = %tenant_id, error = %e, "Reconnect timer fired in unexpected state");
            return;
        }
        self.after_transition().await;

        if let Err(error) = self.open_connection().await {
            tracing::warn!(
                tenant_id = %tenant_id,
                attempt = self.session.reconnect_attempts(),
                error = %error,
                "Reconnect attempt failed"
            );
            let reason = match error {
                EngineError::Deauthorized => DisconnectReason::LoggedOut,
                EngineError::Transient(_) | EngineError::Closed => DisconnectReason::ConnectionLost,
            };
            self.handle_close(reason).await;
        }
    }

    async fn fail_initial_open(&mut self, error: EngineError) -> SessionError {
        let tenant_id = self.tenant_id();
        tracing::warn!(tenant_id = %tenant_id, error = %error, "Could not open engine connection");

        let failure = match error {
            EngineError::Deauthorized => {
                self.purge_credentials().await;
                SessionError::Deauthorized(tenant_id.clone())
            }
            other => SessionError::EngineTransientFailure(other.to_string()),
        };
        if self.session.terminate().is_ok() {
            self.after_transition().await;
        }
        failure
    }

    /// Close and drop the current handle, if any.
    async fn release_connection(&mut self) {
        self.events = None;
        if let Some(connection) = self.connection.take() {
            connection.close().await;
        }
    }

    async fn purge_credentials(&self) {
        let tenant_id = self.session.tenant_id();
        match self.ports.credentials.purge(tenant_id).await {
            Ok(()) => tracing::info!(tenant_id = %tenant_id, "Credentials purged"),
            Err(e) => tracing::error!(tenant_id = %tenant_id, error = %e, "Failed to purge credentials"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Side effects
    // ─────────────────────────────────────────────────────────────────────────

    fn publish_snapshot(&self) {
        self.snapshot.send_replace(self.session.snapshot());
    }

    /// Write-through and fan-out after every state change.
    async fn after_transition(&mut self) {
        self.publish_snapshot();

        let status = PersistedSessionStatus::of(&self.session);
        if let Err(e) = self.ports.status_store.write_session_status(&status).await {
            tracing::warn!(
                tenant_id = %self.session.tenant_id(),
                state = %self.session.state(),
                error = %e,
                "Failed to persist session status"
            );
        }

        self.ports
            .publisher
            .publish(self.session.tenant_id(), SessionEvent::status_of(&self.session))
            .await;
    }
}

async fn next_event(events: &mut Option<mpsc::Receiver<EngineEvent>>) -> Option<EngineEvent> {
    match events {
        Some(events) => events.recv().await,
        None => pending().await,
    }
}

async fn reconnect_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
