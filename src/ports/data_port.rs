//! Data access port trait.

use crate::domain::candlestick::Candlestick;
use crate::domain::error::PlutusError;

/// Per-index model outputs and their row sums.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureFrame {
    pub features: Vec<Vec<f64>>,
    pub features_sum: Vec<f64>,
}

impl FeatureFrame {
    /// Builds a frame, summing each row.
    pub fn new(features: Vec<Vec<f64>>) -> Self {
        let features_sum = features.iter().map(|row| row.iter().sum()).collect();
        Self {
            features,
            features_sum,
        }
    }

    pub fn len(&self) -> usize {
        self.features_sum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features_sum.is_empty()
    }
}

pub trait DataPort {
    /// Candlesticks in ascending open-time order.
    fn fetch_candlesticks(&self) -> Result<Vec<Candlestick>, PlutusError>;

    fn fetch_features(&self) -> Result<FeatureFrame, PlutusError>;
}
