//! Disconnect classification and the reconnect policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Why the engine closed a connection.
///
/// Mapped from the numeric status code the engine attaches to a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    LoggedOut,
    Forbidden,
    ConnectionClosed,
    ConnectionLost,
    ConnectionReplaced,
    BadSession,
    ServiceUnavailable,
    RestartRequired,
    Unknown(u16),
}

impl DisconnectReason {
    pub fn from_status_code(code: u16) -> Self {
        match code {
            401 => DisconnectReason::LoggedOut,
            403 => DisconnectReason::Forbidden,
            428 => DisconnectReason::ConnectionClosed,
            408 => DisconnectReason::ConnectionLost,
            440 => DisconnectReason::ConnectionReplaced,
            500 => DisconnectReason::BadSession,
            503 => DisconnectReason::ServiceUnavailable,
            515 => DisconnectReason::RestartRequired,
            other => DisconnectReason::Unknown(other),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            DisconnectReason::LoggedOut => 401,
            DisconnectReason::Forbidden => 403,
            DisconnectReason::ConnectionClosed => 428,
            DisconnectReason::ConnectionLost => 408,
            DisconnectReason::ConnectionReplaced => 440,
            DisconnectReason::BadSession => 500,
            DisconnectReason::ServiceUnavailable => 503,
            DisconnectReason::RestartRequired => 515,
            DisconnectReason::Unknown(code) => *code,
        }
    }

    /// The remote side revoked this device; retrying cannot succeed.
    pub fn is_deauthorization(&self) -> bool {
        matches!(self, DisconnectReason::LoggedOut | DisconnectReason::Forbidden)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::LoggedOut => write!(f, "logged out (401)"),
            DisconnectReason::Forbidden => write!(f, "forbidden (403)"),
            DisconnectReason::ConnectionClosed => write!(f, "connection closed (428)"),
            DisconnectReason::ConnectionLost => write!(f, "connection lost (408)"),
            DisconnectReason::ConnectionReplaced => write!(f, "connection replaced (440)"),
            DisconnectReason::BadSession => write!(f, "bad session (500)"),
            DisconnectReason::ServiceUnavailable => write!(f, "service unavailable (503)"),
            DisconnectReason::RestartRequired => write!(f, "restart required (515)"),
            DisconnectReason::Unknown(code) => write!(f, "unknown ({})", code),
        }
    }
}

/// Why the policy stopped retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// Logged out or forbidden; credentials are no longer valid.
    Deauthorized,
    /// The maximum number of attempts was reached.
    AttemptsExhausted,
}

/// Outcome of consulting the policy after a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    RetryAfter(Duration),
    GiveUp(GiveUpReason),
}

/// Capped exponential backoff with an optional attempt limit.
///
/// `delay = min(base_delay * multiplier^attempt, max_delay)`
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// Fixed delay, retry forever.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
            max_attempts: None,
        }
    }

    /// Decide what to do after a close.
    ///
    /// `attempts_so_far` is the number of reconnects already made since the
    /// last successful connection.
    pub fn decide(&self, reason: DisconnectReason, attempts_so_far: u32) -> ReconnectDecision {
        if reason.is_deauthorization() {
            return ReconnectDecision::GiveUp(GiveUpReason::Deauthorized);
        }
        if let Some(max) = self.max_attempts {
            if attempts_so_far >= max {
                return ReconnectDecision::GiveUp(GiveUpReason::AttemptsExhausted);
            }
        }
        ReconnectDecision::RetryAfter(self.delay_for(attempts_so_far))
    }

    /// Backoff delay before reconnect number `attempt + 1`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped >= 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            self.max_delay
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            max_attempts: Some(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_status_codes() {
        assert_eq!(DisconnectReason::from_status_code(401), DisconnectReason::LoggedOut);
        assert_eq!(DisconnectReason::from_status_code(403), DisconnectReason::Forbidden);
        assert_eq!(DisconnectReason::from_status_code(428), DisconnectReason::ConnectionClosed);
        assert_eq!(DisconnectReason::from_status_code(408), DisconnectReason::ConnectionLost);
        assert_eq!(DisconnectReason::from_status_code(440), DisconnectReason::ConnectionReplaced);
        assert_eq!(DisconnectReason::from_status_code(500), DisconnectReason::BadSession);
        assert_eq!(DisconnectReason::from_status_code(503), DisconnectReason::ServiceUnavailable);
        assert_eq!(DisconnectReason::from_status_code(515), DisconnectReason::RestartRequired);
        assert_eq!(DisconnectReason::from_status_code(999), DisconnectReason::Unknown(999));
    }

    #[test]
    fn status_code_round_trips() {
        for code in [401, 403, 408, 428, 440, 500, 503, 515, 1000] {
            assert_eq!(DisconnectReason::from_status_code(code).status_code(), code);
        }
    }

    #[test]
    fn logged_out_and_forbidden_are_never_retried() {
        let policy = ReconnectPolicy::default();
        for reason in [DisconnectReason::LoggedOut, DisconnectReason::Forbidden] {
            assert_eq!(
                policy.decide(reason, 0),
                ReconnectDecision::GiveUp(GiveUpReason::Deauthorized)
            );
        }
    }

    #[test]
    fn other_reasons_retry_with_base_delay_first() {
        let policy = ReconnectPolicy::default();
        for reason in [
            DisconnectReason::ConnectionClosed,
            DisconnectReason::ConnectionLost,
            DisconnectReason::ConnectionReplaced,
            DisconnectReason::RestartRequired,
            DisconnectReason::Unknown(0),
        ] {
            assert_eq!(
                policy.decide(reason, 0),
                ReconnectDecision::RetryAfter(Duration::from_secs(5))
            );
        }
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(2), Duration::from_secs(20));
        assert_eq!(policy.delay_for(3), Duration::from_secs(40));
        assert_eq!(policy.delay_for(4), Duration::from_secs(60));
        assert_eq!(policy.delay_for(500), Duration::from_secs(60));
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let policy = ReconnectPolicy::default();
        assert!(matches!(
            policy.decide(DisconnectReason::ConnectionLost, 9),
            ReconnectDecision::RetryAfter(_)
        ));
        assert_eq!(
            policy.decide(DisconnectReason::ConnectionLost, 10),
            ReconnectDecision::GiveUp(GiveUpReason::AttemptsExhausted)
        );
    }

    #[test]
    fn fixed_policy_retries_forever_at_same_delay() {
        let policy = ReconnectPolicy::fixed(Duration::from_secs(5));
        assert_eq!(
            policy.decide(DisconnectReason::BadSession, 10_000),
            ReconnectDecision::RetryAfter(Duration::from_secs(5))
        );
    }
}
