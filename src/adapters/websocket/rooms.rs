//! WebSocket room management for tenant-scoped event fan-out.
//!
//! Rooms are organized by tenant, so every event of a tenant's session
//! reaches all clients watching that tenant and nobody else.
//!
//! # Architecture
//!
//! ```text
//! Room: tenant-a       Room: tenant-b
//! ├── client-1         ├── client-4
//! ├── client-2         └── client-5
//! └── client-3
//! ```

use async_trait::async_trait;
use std::collections::HashMap;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::domain::foundation::TenantId;
use crate::domain::session::SessionEvent;
use crate::ports::SessionEventPublisher;

use super::messages::TenantEvent;

/// Unique identifier for a subscriber (usually a WebSocket connection).
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a new random client ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Manages subscriber rooms organized by tenant.
///
/// Provides:
/// - Subscribe/unsubscribe operations
/// - Publish to all subscribers of a tenant
/// - Cleanup of rooms whose last subscriber left
///
/// Each room is a bounded broadcast channel: a subscriber that falls
/// behind loses the oldest events instead of slowing the publisher.
pub struct RoomManager {
    /// Map of tenant_id → broadcast sender for that room.
    rooms: RwLock<HashMap<TenantId, broadcast::Sender<TenantEvent>>>,

    /// Map of client_id → tenant_id for O(1) cleanup on disconnect.
    client_tenants: RwLock<HashMap<ClientId, TenantId>>,

    /// Channel capacity for each room's broadcast channel.
    channel_capacity: usize,
}

impl RoomManager {
    /// Create a new room manager with specified channel capacity.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            client_tenants: RwLock::new(HashMap::new()),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Create with default capacity (128 events).
    pub fn with_default_capacity() -> Self {
        Self::new(128)
    }

    /// Subscribe a client to a tenant's room, creating the room if needed.
    ///
    /// A client belongs to at most one room; subscribing again moves it.
    pub async fn subscribe(
        &self,
        tenant_id: &TenantId,
        client_id: ClientId,
    ) -> broadcast::Receiver<TenantEvent> {
        let mut rooms = self.rooms.write().await;
        let mut client_tenants = self.client_tenants.write().await;

        let receiver = rooms
            .entry(tenant_id.clone())
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .subscribe();

        if let Some(previous) = client_tenants.insert(client_id, tenant_id.clone()) {
            if &previous != tenant_id {
                Self::remove_if_empty(&mut rooms, &client_tenants, &previous);
            }
        }

        receiver
    }

    /// Remove a client from its room.
    ///
    /// The room is dropped when this was its last subscriber.
    pub async fn unsubscribe(&self, client_id: &ClientId) {
        let mut rooms = self.rooms.write().await;
        let mut client_tenants = self.client_tenants.write().await;

        if let Some(tenant_id) = client_tenants.remove(client_id) {
            Self::remove_if_empty(&mut rooms, &client_tenants, &tenant_id);
        }
    }

    fn remove_if_empty(
        rooms: &mut HashMap<TenantId, broadcast::Sender<TenantEvent>>,
        client_tenants: &HashMap<ClientId, TenantId>,
        tenant_id: &TenantId,
    ) {
        if !client_tenants.values().any(|t| t == tenant_id) {
            rooms.remove(tenant_id);
        }
    }

    /// Number of subscribers in a tenant's room.
    pub async fn client_count(&self, tenant_id: &TenantId) -> usize {
        self.client_tenants
            .read()
            .await
            .values()
            .filter(|t| *t == tenant_id)
            .count()
    }

    /// Tenants that currently have a room.
    pub async fn active_rooms(&self) -> Vec<TenantId> {
        self.rooms.read().await.keys().cloned().collect()
    }

    /// Total subscribers across all rooms.
    pub async fn total_client_count(&self) -> usize {
        self.client_tenants.read().await.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl SessionEventPublisher for RoomManager {
    async fn publish(&self, tenant_id: &TenantId, event: SessionEvent) -> usize {
        let rooms = self.rooms.read().await;
        match rooms.get(tenant_id) {
            // No receivers is not an error.
            Some(sender) => sender
                .send(TenantEvent::new(tenant_id.clone(), event))
                .unwrap_or(0),
            None => 0,
        }
    }
}
