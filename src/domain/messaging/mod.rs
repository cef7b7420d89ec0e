//! Messaging domain module.
//!
//! Destination parsing, inbound envelope text extraction and the records
//! the message pipeline persists.

mod address;
mod content;
mod record;

pub use address::{
    bare_address, Destination, GROUP_SERVER, MAX_PHONE_DIGITS,
    STATUS_BROADCAST, USER_SERVER,
};
pub use content::{InboundMessage, MessagePayload};
pub use record::{Counterpart, DeliveryStatus, Direction, MessageRecord};
