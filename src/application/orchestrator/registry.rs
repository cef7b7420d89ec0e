//! Session registry - which tenants have a live worker right now.
//!
//! The map is the only state shared across tenants. Every mutation takes
//! the write lock for a handful of map operations and never awaits while
//! holding it; opening connections happens later, inside the tenant's own
//! worker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tokio::sync::{mpsc, oneshot, watch};

use crate::domain::foundation::{EngineMessageId, TenantId};
use crate::domain::messaging::Destination;
use crate::domain::session::{SessionError, SessionSnapshot};

/// Requests handled by a session worker.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    Send {
        destination: Destination,
        content: String,
        reply: oneshot::Sender<Result<EngineMessageId, SessionError>>,
    },
    /// Tear down for good and purge credentials.
    Disconnect { reply: oneshot::Sender<()> },
    /// Close the connection but keep credentials and persisted status.
    Shutdown { reply: oneshot::Sender<()> },
}

/// Cheap, cloneable reference to a tenant's worker.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tenant_id: TenantId,
    worker_id: u64,
    commands: mpsc::Sender<SessionCommand>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(
        tenant_id: TenantId,
        worker_id: u64,
        commands: mpsc::Sender<SessionCommand>,
        snapshot: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            tenant_id,
            worker_id,
            commands,
            snapshot,
        }
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    /// Latest published snapshot. Never waits on the worker.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that observes every snapshot the worker publishes.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// A worker is still running and the session has not terminated.
    pub fn is_live(&self) -> bool {
        !self.commands.is_closed() && !self.snapshot.borrow().is_terminated()
    }

    /// Send through the tenant's connection.
    ///
    /// # Errors
    ///
    /// - `NotConnected` if the worker is gone or the session is not connected
    /// - `EngineTransientFailure` if the engine refused the message
    pub async fn send(
        &self,
        destination: Destination,
        content: String,
    ) -> Result<EngineMessageId, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(SessionCommand::Send {
                destination,
                content,
                reply,
            })
            .await
            .map_err(|_| SessionError::NotConnected(self.tenant_id.clone()))?;
        response
            .await
            .map_err(|_| SessionError::NotConnected(self.tenant_id.clone()))?
    }

    /// Terminate the session. Returns `false` if the worker was already gone.
    pub async fn disconnect(&self) -> bool {
        let (reply, done) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::Disconnect { reply })
            .await
            .is_err()
        {
            return false;
        }
        done.await.is_ok()
    }

    /// Stop the worker without forgetting the tenant's pairing.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::Shutdown { reply })
            .await
            .is_ok()
        {
            let _ = done.await;
        }
    }
}

/// Result of [`SessionRegistry::get_or_create`].
#[derive(Debug)]
pub enum Registration<T> {
    /// A live session already existed; nothing was created.
    Existing(SessionHandle),
    /// A new handle was registered; `T` is whatever the factory produced
    /// alongside it (the worker still to be spawned).
    Created(SessionHandle, T),
}

/// Concurrency-safe map from tenant to live session handle.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<TenantId, SessionHandle>>,
    next_worker_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the tenant's live session, or register a new one.
    ///
    /// `create` receives a fresh worker id and runs under the write lock,
    /// so it must not block. Terminated or orphaned handles are replaced.
    pub fn get_or_create<T, F>(&self, tenant_id: &TenantId, create: F) -> Registration<T>
    where
        F: FnOnce(u64) -> (SessionHandle, T),
    {
        let mut sessions = self.sessions.write().expect("session registry: lock poisoned");
        if let Some(existing) = sessions.get(tenant_id) {
            if existing.is_live() {
                return Registration::Existing(existing.clone());
            }
        }

        let worker_id = self.next_worker_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (handle, extra) = create(worker_id);
        sessions.insert(tenant_id.clone(), handle.clone());
        Registration::Created(handle, extra)
    }

    pub fn get(&self, tenant_id: &TenantId) -> Option<SessionHandle> {
        self.sessions
            .read()
            .expect("session registry: lock poisoned")
            .get(tenant_id)
            .cloned()
    }

    /// Remove the tenant's entry only if it still belongs to `worker_id`.
    ///
    /// A finished worker therefore never evicts its successor.
    pub fn remove(&self, tenant_id: &TenantId, worker_id: u64) -> bool {
        let mut sessions = self.sessions.write().expect("session registry: lock poisoned");
        match sessions.get(tenant_id) {
            Some(handle) if handle.worker_id == worker_id => {
                sessions.remove(tenant_id);
                true
            }
            _ => false,
        }
    }

    /// Snapshots of every registered session, ordered by tenant.
    pub fn list(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<SessionSnapshot> = self
            .sessions
            .read()
            .expect("session registry: lock poisoned")
            .values()
            .map(SessionHandle::snapshot)
            .collect();
        snapshots.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));
        snapshots
    }

    pub fn handles(&self) -> Vec<SessionHandle> {
        self.sessions
            .read()
            .expect("session registry: lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .expect("session registry: lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{Session, SessionState};

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    struct Parts {
        commands: mpsc::Receiver<SessionCommand>,
        snapshot: watch::Sender<SessionSnapshot>,
    }

    fn factory(tenant_id: &TenantId) -> impl FnOnce(u64) -> (SessionHandle, Parts) + '_ {
        move |worker_id| {
            let (tx, rx) = mpsc::channel(4);
            let (snapshot_tx, snapshot_rx) =
                watch::channel(Session::new(tenant_id.clone()).snapshot());
            (
                SessionHandle::new(tenant_id.clone(), worker_id, tx, snapshot_rx),
                Parts {
                    commands: rx,
                    snapshot: snapshot_tx,
                },
            )
        }
    }

    #[test]
    fn get_or_create_returns_existing_live_session() {
        let registry = SessionRegistry::new();
        let t = tenant("u1");

        let first = match registry.get_or_create(&t, factory(&t)) {
            Registration::Created(handle, parts) => (handle, parts),
            Registration::Existing(_) => panic!("expected a new session"),
        };

        match registry.get_or_create(&t, factory(&t)) {
            Registration::Existing(handle) => assert_eq!(handle.worker_id(), first.0.worker_id()),
            Registration::Created(..) => panic!("second call must not create"),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_or_create_replaces_terminated_session() {
        let registry = SessionRegistry::new();
        let t = tenant("u1");

        let Registration::Created(old, parts) = registry.get_or_create(&t, factory(&t)) else {
            panic!("expected a new session");
        };
        parts.snapshot.send_modify(|s| s.state = SessionState::Terminated);

        let Registration::Created(new, _parts) = registry.get_or_create(&t, factory(&t)) else {
            panic!("terminated session must be replaced");
        };
        assert_ne!(old.worker_id(), new.worker_id());
        assert_eq!(registry.get(&t).unwrap().worker_id(), new.worker_id());
    }

    #[test]
    fn get_or_create_replaces_session_whose_worker_is_gone() {
        let registry = SessionRegistry::new();
        let t = tenant("u1");

        let Registration::Created(_, parts) = registry.get_or_create(&t, factory(&t)) else {
            panic!("expected a new session");
        };
        drop(parts.commands);

        assert!(matches!(
            registry.get_or_create(&t, factory(&t)),
            Registration::Created(..)
        ));
    }

    #[test]
    fn remove_only_evicts_the_matching_worker() {
        let registry = SessionRegistry::new();
        let t = tenant("u1");

        let Registration::Created(old, parts) = registry.get_or_create(&t, factory(&t)) else {
            panic!("expected a new session");
        };
        drop(parts);
        let Registration::Created(new, _parts) = registry.get_or_create(&t, factory(&t)) else {
            panic!("expected a replacement");
        };

        assert!(!registry.remove(&t, old.worker_id()));
        assert_eq!(registry.get(&t).unwrap().worker_id(), new.worker_id());
        assert!(registry.remove(&t, new.worker_id()));
        assert!(registry.is_empty());
    }

    #[test]
    fn list_is_sorted_by_tenant() {
        let registry = SessionRegistry::new();
        let (b, a) = (tenant("bravo"), tenant("alpha"));
        let _b = registry.get_or_create(&b, factory(&b));
        let _a = registry.get_or_create(&a, factory(&a));

        let listed: Vec<_> = registry.list().into_iter().map(|s| s.tenant_id).collect();
        assert_eq!(listed, vec![a, b]);
    }

    #[tokio::test]
    async fn send_to_gone_worker_is_not_connected() {
        let registry = SessionRegistry::new();
        let t = tenant("u1");
        let Registration::Created(handle, parts) = registry.get_or_create(&t, factory(&t)) else {
            panic!("expected a new session");
        };
        drop(parts);

        let destination = Destination::parse("15551234567").unwrap();
        let err = handle.send(destination, "hi".into()).await.unwrap_err();
        assert_eq!(err, SessionError::NotConnected(t));
    }
}
