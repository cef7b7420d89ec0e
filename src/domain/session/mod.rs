//! Session domain module.
//!
//! Lifecycle of one tenant's protocol connection: the state machine, the
//! aggregate that enforces it, the reconnect policy consulted on every
//! close, and the events fanned out to subscribers.

mod aggregate;
mod errors;
mod events;
mod reconnect;
mod state;

pub use aggregate::{Session, SessionSnapshot};
pub use errors::SessionError;
pub use events::SessionEvent;
pub use reconnect::{DisconnectReason, GiveUpReason, ReconnectDecision, ReconnectPolicy};
pub use state::SessionState;
