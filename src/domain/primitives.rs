//! Domain primitives: TimeMs and timestamp helpers.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Marketplace order identifier.
pub type OrderId = i64;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Parse an RFC 3339 timestamp as sent by the marketplace
    /// (`2024-05-01T10:20:30.000-04:00`).
    pub fn parse_rfc3339(s: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| TimeMs(dt.timestamp_millis()))
    }

    /// `YYYY-MM-DD HH:mm:ss` in the given offset.
    pub fn format_local(&self, offset: FixedOffset) -> String {
        match offset.timestamp_millis_opt(self.0).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => String::new(),
        }
    }

    /// ISO 8601 UTC string with milliseconds, the format the order search expects.
    pub fn to_iso_utc(&self) -> String {
        match Utc.timestamp_millis_opt(self.0).single() {
            Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            None => String::new(),
        }
    }

    pub fn saturating_sub_days(&self, days: i64) -> Self {
        TimeMs(self.0.saturating_sub(days.saturating_mul(DAY_MS)))
    }
}

pub const DAY_MS: i64 = 86_400_000;

/// Inclusive millisecond bounds of a local calendar-day range.
pub fn local_day_bounds(from: NaiveDate, to: NaiveDate, offset: FixedOffset) -> (TimeMs, TimeMs) {
    let start = from
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0);
    let end = to
        .and_hms_milli_opt(23, 59, 59, 999)
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(i64::MAX);
    (TimeMs(start), TimeMs(end))
}

/// Today's date in the given offset.
pub fn today_in(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}
