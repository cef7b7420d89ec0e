//! WebSocket adapters for live session updates.
//!
//! Pushes session events to connected clients, grouped by tenant.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Session workers                                  │
//! │   status changes │ pairing codes │ inbound messages                  │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ SessionEventPublisher::publish
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      RoomManager                                     │
//! │   Room: tenant-a       Room: tenant-b       Room: tenant-c           │
//! │   ├── client-1         ├── client-4         └── client-6             │
//! │   ├── client-2         └── client-5                                  │
//! │   └── client-3                                                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - WebSocket message protocol types
//! - [`rooms`] - Per-tenant broadcast rooms
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod handler;
pub mod messages;
pub mod rooms;

pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use messages::{
    ClientMessage, ConnectedMessage, ErrorMessage, PongMessage, ServerMessage,
    SessionEventMessage, StatusMessage, TenantEvent,
};
pub use rooms::{ClientId, RoomManager};
