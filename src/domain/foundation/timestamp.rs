//! Timestamp value object for immutable points in time.
//!
//! Historical events were written by more than one producer, so timestamps
//! arrive either as RFC 3339 strings or as unix epoch milliseconds. The
//! custom `Deserialize` impl normalizes both to the same representation so
//! replay is deterministic regardless of how an event was serialized.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
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

    /// Creates a timestamp from unix epoch milliseconds.
    pub fn from_unix_millis(millis: i64) -> Self {
        Self(Utc.timestamp_millis_opt(millis).single().unwrap_or_default())
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the timestamp as unix epoch milliseconds.
    pub fn as_unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Creates a new timestamp by adding the specified number of days.
    ///
    /// Negative values subtract days.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Creates a new timestamp by subtracting the specified number of days.
    pub fn minus_days(&self, days: i64) -> Self {
        Self(self.0 - Duration::days(days))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self(Utc.timestamp_millis_opt(0).single().expect("epoch is valid"))
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Rfc3339(String),
            Millis(i64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Rfc3339(s) => s
                .parse::<DateTime<Utc>>()
                .map(Timestamp)
                .map_err(|e| de::Error::custom(format!("invalid timestamp '{}': {}", s, e))),
            Raw::Millis(ms) => Ok(Timestamp::from_unix_millis(ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_monotone_within_bounds() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();
        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn deserializes_rfc3339_string() {
        let ts: Timestamp = serde_json::from_str(r#""2025-06-01T12:00:00Z""#).unwrap();
        assert_eq!(ts.as_unix_millis(), 1748779200000);
    }

    #[test]
    fn deserializes_unix_millis() {
        let ts: Timestamp = serde_json::from_str("1748779200000").unwrap();
        assert_eq!(ts.as_unix_millis(), 1748779200000);
    }

    #[test]
    fn string_and_millis_forms_normalize_identically() {
        let from_str: Timestamp = serde_json::from_str(r#""2025-06-01T12:00:00Z""#).unwrap();
        let from_ms: Timestamp = serde_json::from_str("1748779200000").unwrap();
        assert_eq!(from_str, from_ms);
    }

    #[test]
    fn serializes_as_rfc3339() {
        let ts = Timestamp::from_unix_millis(0);
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("1970-01-01"));
    }

    #[test]
    fn day_arithmetic_round_trips() {
        let ts = Timestamp::now();
        assert_eq!(ts.add_days(7).minus_days(7), ts);
        assert!(ts.add_days(1).is_after(&ts));
        assert!(ts.minus_days(1).is_before(&ts));
    }
}
