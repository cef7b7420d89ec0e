//! Domain layer - Pure business logic with no infrastructure dependencies.
//!
//! - `foundation` - Shared value objects, identifiers and errors
//! - `session` - Per-tenant session lifecycle and reconnect policy
//! - `messaging` - Addresses, inbound extraction and message records

pub mod foundation;
pub mod messaging;
pub mod session;
