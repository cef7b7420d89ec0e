//! Protocol addresses and destination normalization.

use std::fmt;

use crate::domain::session::SessionError;

/// Server part of one-to-one chat addresses.
pub const USER_SERVER: &str = "s.whatsapp.net";

/// Server part of group chat addresses.
pub const GROUP_SERVER: &str = "g.us";

/// Pseudo-chat carrying status updates.
pub const STATUS_BROADCAST: &str = "status@broadcast";

pub const MAX_PHONE_DIGITS: usize = 15;

/// Characters people put in phone numbers that carry no meaning.
const PHONE_SEPARATORS: [char; 6] = ['+', ' ', '-', '.', '(', ')'];

/// A validated outbound destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// A phone number, digits only.
    User(String),
    /// A group id, `digits` or `digits-digits`.
    Group(String),
}

impl Destination {
    /// Parse a caller-supplied destination.
    ///
    /// Accepts a phone number in any common notation, or an address that
    /// is already qualified with the user or group server.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SessionError::invalid_destination(raw, "destination is empty"));
        }

        if let Some((user, server)) = trimmed.split_once('@') {
            return match server {
                USER_SERVER => Self::phone_digits(raw, user).map(Destination::User),
                GROUP_SERVER if is_group_id(user) => Ok(Destination::Group(user.to_string())),
                GROUP_SERVER => Err(SessionError::invalid_destination(raw, "malformed group id")),
                _ => Err(SessionError::invalid_destination(
                    raw,
                    format!("unsupported server '{}'", server),
                )),
            };
        }

        let digits: String = trimmed
            .chars()
            .filter(|c| !PHONE_SEPARATORS.contains(c))
            .collect();
        Self::phone_digits(raw, &digits).map(Destination::User)
    }

    fn phone_digits(raw: &str, digits: &str) -> Result<String, SessionError> {
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(SessionError::invalid_destination(
                raw,
                "phone number must contain only digits",
            ));
        }
        if digits.len() > MAX_PHONE_DIGITS {
            return Err(SessionError::invalid_destination(
                raw,
                format!("phone number must have at most {} digits", MAX_PHONE_DIGITS),
            ));
        }
        Ok(digits.to_string())
    }

    /// Fully qualified protocol address.
    pub fn jid(&self) -> String {
        match self {
            Destination::User(digits) => format!("{}@{}", digits, USER_SERVER),
            Destination::Group(id) => format!("{}@{}", id, GROUP_SERVER),
        }
    }

    /// Bare address without the server part.
    pub fn address(&self) -> &str {
        match self {
            Destination::User(digits) => digits,
            Destination::Group(id) => id,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.jid())
    }
}

fn is_group_id(id: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    match id.split_once('-') {
        Some((creator, created)) => all_digits(creator) && all_digits(created),
        None => all_digits(id),
    }
}

/// Strip the server and any device suffix from a protocol address.
///
/// `15551234567:12@s.whatsapp.net` becomes `15551234567`.
pub fn bare_address(jid: &str) -> &str {
    let user = jid.split('@').next().unwrap_or(jid);
    user.split(':').next().unwrap_or(user)
}
