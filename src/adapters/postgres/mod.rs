//! PostgreSQL adapters - Database implementations of the store ports.
//!
//! - `PostgresSessionStatusStore` - Last known session state per tenant
//! - `PostgresMessageStore` - Message records and counterparts
//!
//! Schema lives in `migrations/` and is applied with [`MIGRATOR`].

mod message_store;
mod session_status_store;

pub use message_store::PostgresMessageStore;
pub use session_status_store::PostgresSessionStatusStore;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
