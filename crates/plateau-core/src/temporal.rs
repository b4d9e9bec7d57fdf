//! # Temporal Types — Millisecond UTC Timestamps
//!
//! [`Timestamp`] is the instant type used for record creation times and
//! pagination bounds. It is always UTC and always truncated to whole
//! milliseconds, which is exactly the precision a [`crate::PageCursor`]
//! carries, so a stored value and the cursor built from it compare equal
//! under the strict `<` bound applied during paging.
//!
//! Parsing accepts any RFC 3339 offset and normalizes to UTC.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A UTC instant truncated to millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "DateTime<Utc>", into = "DateTime<Utc>")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to milliseconds.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Wrap a `DateTime<Utc>`, dropping sub-millisecond precision.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_millis(dt))
    }

    /// Build from milliseconds since the Unix epoch.
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Parse an RFC 3339 string with any offset, normalizing to UTC.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidInput`] if the string is not RFC 3339.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| CoreError::InvalidInput(format!("invalid RFC 3339 timestamp {s:?}: {e}")))?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// The wrapped `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// `YYYY-MM-DDTHH:MM:SS.sssZ`.
    pub fn to_rfc3339_millis(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_utc(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339_millis())
    }
}

fn truncate_to_millis(dt: DateTime<Utc>) -> DateTime<Utc> {
    // Whole milliseconds always map back to a valid instant.
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn truncates_sub_millisecond_precision() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let ts = Timestamp::from_utc(dt);
        assert_eq!(ts.to_rfc3339_millis(), "2026-01-15T12:00:00.123Z");
        assert_eq!(ts.as_datetime().timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn formats_whole_seconds_with_zero_millis() {
        let ts = Timestamp::from_utc(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 5).unwrap());
        assert_eq!(ts.to_string(), "2026-03-01T00:00:05.000Z");
    }

    #[test]
    fn parse_normalizes_offsets_to_utc() {
        let ts = Timestamp::parse("2026-01-15T17:30:00.250+05:30").unwrap();
        assert_eq!(ts.to_rfc3339_millis(), "2026-01-15T12:00:00.250Z");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Timestamp::parse("yesterday"),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn ordering_follows_time() {
        let a = Timestamp::from_millis(1_000).unwrap();
        let b = Timestamp::from_millis(2_000).unwrap();
        assert!(a < b);
    }

    #[test]
    fn serde_round_trip_keeps_millis() {
        let ts = Timestamp::from_millis(1_768_478_400_123).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
