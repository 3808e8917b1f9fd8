//! One-minute candlestick representation.

use chrono::{DateTime, Utc};

pub const MINUTE_MS: i64 = 60_000;

/// A single bar. Times are milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candlestick {
    pub open_time: i64,
    pub close_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candlestick {
    pub fn open_datetime(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.open_time)
    }

    pub fn close_datetime(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.close_time)
    }
}

/// Largest minute count whose milliseconds fit in an `i64`.
pub const MAX_MINUTES: i64 = i64::MAX / MINUTE_MS;

/// `timestamp_ms + minutes` worth of milliseconds, saturating at the `i64` bounds.
pub fn add_minutes(timestamp_ms: i64, minutes: i64) -> i64 {
    timestamp_ms.saturating_add(minutes.saturating_mul(MINUTE_MS))
}

pub fn to_datetime(timestamp_ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(timestamp_ms)
}
