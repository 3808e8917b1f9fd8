//! Fixed-interval lookback indexer.
//!
//! Feature rows are produced once per interval starting at the first
//! candlestick, so every minute inside an interval shares the row of the
//! interval that contains it.

use crate::domain::candlestick::{MAX_MINUTES, MINUTE_MS};
use crate::ports::indexer::LookbackIndexer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalIndexer {
    first_open_time: i64,
    interval_ms: i64,
}

impl IntervalIndexer {
    /// `interval_minutes` below one is treated as one; intervals too long
    /// for millisecond arithmetic are capped.
    pub fn new(first_open_time: i64, interval_minutes: i64) -> Self {
        Self {
            first_open_time,
            interval_ms: interval_minutes.clamp(1, MAX_MINUTES) * MINUTE_MS,
        }
    }
}

impl LookbackIndexer for IntervalIndexer {
    fn index_of(&self, open_time: i64) -> Option<usize> {
        let elapsed = open_time.checked_sub(self.first_open_time)?;
        if elapsed < 0 {
            return None;
        }
        usize::try_from(elapsed / self.interval_ms).ok()
    }
}
