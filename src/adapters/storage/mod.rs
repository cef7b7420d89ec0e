//! Storage Adapters
//!
//! Implementations of the credential, session status and message store
//! ports that do not need a database.
//!
//! ## Available Adapters
//!
//! - **FileCredentialStore** - One JSON file per credential entry on disk
//! - **InMemoryCredentialStore** - Credentials in memory (testing)
//! - **InMemorySessionStatusStore** - Session status in memory (development/testing)
//! - **InMemoryMessageStore** - Messages and counterparts in memory (development/testing)
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::{FileCredentialStore, InMemoryMessageStore};
//!
//! let credentials = FileCredentialStore::new("./data/credentials");
//! let messages = InMemoryMessageStore::new();
//! ```

mod file_credential_store;
mod in_memory_credential_store;
mod in_memory_message_store;
mod in_memory_session_status_store;

pub use file_credential_store::FileCredentialStore;
pub use in_memory_credential_store::InMemoryCredentialStore;
pub use in_memory_message_store::InMemoryMessageStore;
pub use in_memory_session_status_store::InMemorySessionStatusStore;
