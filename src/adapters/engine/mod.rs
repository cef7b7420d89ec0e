//! Protocol engine adapters.

mod simulated;

pub use simulated::{SentMessage, SimulatedEngine, IDENTITY_KEY};
