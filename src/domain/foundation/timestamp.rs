//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Creates a timestamp from Unix seconds, as engines report message times.
    ///
    /// Out-of-range values fall back to the current time.
    pub fn from_unix_secs(secs: i64) -> Self {
        Utc.timestamp_opt(secs, 0)
            .single()
            .map(Self)
            .unwrap_or_else(Self::now)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// RFC 3339 rendering used on the wire.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn from_unix_secs_round_trips() {
        let ts = Timestamp::from_unix_secs(1_700_000_000);
        assert_eq!(ts.as_unix_secs(), 1_700_000_000);
    }

    #[test]
    fn from_unix_secs_out_of_range_falls_back_to_now() {
        let ts = Timestamp::from_unix_secs(i64::MAX);
        assert!(ts.duration_since(&Timestamp::now()).num_seconds().abs() < 5);
    }

    #[test]
    fn duration_since_is_signed() {
        let earlier = Timestamp::from_unix_secs(100);
        let later = Timestamp::from_unix_secs(160);
        assert_eq!(later.duration_since(&earlier).num_seconds(), 60);
        assert_eq!(earlier.duration_since(&later).num_seconds(), -60);
    }

    #[test]
    fn serializes_as_rfc3339_string() {
        let ts = Timestamp::from_unix_secs(0);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, r#""1970-01-01T00:00:00Z""#);
    }
}
