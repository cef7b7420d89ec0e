//! Ports - Interfaces between the application core and the outside world.
//!
//! - `ProtocolEngine` - Opens per-tenant protocol connections
//! - `CredentialStore` - Durable pairing credentials
//! - `SessionStatusStore` - Last known session state for restore
//! - `MessageStore` - Message records and counterparts
//! - `SessionEventPublisher` - Fan-out of session events

mod credential_store;
mod event_publisher;
mod message_store;
mod protocol_engine;
mod session_status_store;

pub use credential_store::{
    CredentialBundle, CredentialStore, CredentialStoreError, CredentialUpdate,
};
pub use event_publisher::SessionEventPublisher;
pub use message_store::MessageStore;
pub use protocol_engine::{
    ClientOptions, EngineConnection, EngineError, EngineEvent, OpenedConnection, ProtocolEngine,
};
pub use session_status_store::{PersistedSessionStatus, SessionStatusStore};
