//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `engine` - Protocol engine bindings (simulated)
//! - `storage` - File credential store and in-memory stores
//! - `postgres` - PostgreSQL session status and message stores
//! - `websocket` - Per-tenant event rooms and the live socket endpoint
//! - `http` - REST API

pub mod engine;
pub mod http;
pub mod postgres;
pub mod storage;
pub mod websocket;

pub use engine::SimulatedEngine;
pub use postgres::{PostgresMessageStore, PostgresSessionStatusStore};
pub use storage::{
    FileCredentialStore, InMemoryCredentialStore, InMemoryMessageStore,
    InMemorySessionStatusStore,
};
pub use websocket::RoomManager;
