//! Application layer - session orchestration and startup restore.
//!
//! Coordinates the domain with the ports: each tenant's session runs in
//! its own worker, reached through the orchestrator.

pub mod bootstrap;
pub mod orchestrator;

pub use bootstrap::{restore_sessions, RestoreReport};
pub use orchestrator::{
    BulkReport, BulkResult, BulkSendRequest, ConnectOutcome, OrchestratorConfig, SessionCounts,
    SessionHandle, SessionOrchestrator, SessionPorts, SessionRegistry,
};
