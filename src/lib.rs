//! Tenant Gateway - multi-tenant messaging session orchestrator.
//!
//! Keeps one long-lived messaging-protocol session per tenant inside a
//! single process, reconnecting them as needed and fanning their events
//! out to live subscribers.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
