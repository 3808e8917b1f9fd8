//! Maps candlestick open times to feature rows.

use std::collections::HashMap;

/// Resolves a candlestick's open time to an index into the feature arrays.
///
/// `None` means the candlestick has no prediction row; the run ends there.
pub trait LookbackIndexer {
    fn index_of(&self, open_time: i64) -> Option<usize>;
}

impl LookbackIndexer for HashMap<i64, usize> {
    fn index_of(&self, open_time: i64) -> Option<usize> {
        self.get(&open_time).copied()
    }
}
