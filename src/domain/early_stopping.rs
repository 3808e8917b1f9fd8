//! Early stopping for long evaluations.
//!
//! A run that produces too few positions by fixed points of the dataset, or
//! whose points fall to a floor, is not worth finishing. The policy is
//! consulted once per candlestick and answers with a reason when the run
//! should stop.

use super::error::ConfigError;
use super::percentage::round_to;

/// Snapshot handed to a [`StopPolicy`] after each candlestick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Ordinal of the candlestick just processed.
    pub candlestick_index: usize,
    pub long_count: usize,
    pub short_count: usize,
    pub points: f64,
}

pub trait StopPolicy {
    /// `Some(reason)` stops the run.
    fn check(&mut self, progress: &Progress) -> Option<String>;
}

/// Lets every run finish.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverStop;

impl StopPolicy for NeverStop {
    fn check(&mut self, _progress: &Progress) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointConfig {
    /// Position in the dataset, `0 < fraction <= 1`.
    pub dataset_fraction: f64,
    pub required_longs: usize,
    pub required_shorts: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EarlyStoppingConfig {
    pub checkpoints: Vec<CheckpointConfig>,
    pub min_points: Option<f64>,
}

impl Default for EarlyStoppingConfig {
    fn default() -> Self {
        let checkpoint = |dataset_fraction, required| CheckpointConfig {
            dataset_fraction,
            required_longs: required,
            required_shorts: required,
        };
        EarlyStoppingConfig {
            checkpoints: vec![
                checkpoint(0.15, 1),
                checkpoint(0.3, 3),
                checkpoint(0.5, 10),
                checkpoint(0.7, 15),
            ],
            min_points: Some(-35.0),
        }
    }
}

impl EarlyStoppingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for checkpoint in &self.checkpoints {
            let f = checkpoint.dataset_fraction;
            if !(f > 0.0 && f <= 1.0) {
                return Err(ConfigError::invalid(
                    "early_stopping.checkpoints",
                    "dataset fractions must be within (0, 1]",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Checkpoint {
    index: usize,
    passed: bool,
    required_longs: usize,
    required_shorts: usize,
    motive: String,
}

/// Checkpoint and points-floor policy built for a dataset of known length.
#[derive(Debug, Clone, PartialEq)]
pub struct EarlyStopping {
    process_name: String,
    checkpoints: Vec<Checkpoint>,
    min_points: Option<f64>,
}

impl EarlyStopping {
    pub fn new(process_name: &str, candlesticks_num: usize, config: &EarlyStoppingConfig) -> Self {
        let checkpoints = config
            .checkpoints
            .iter()
            .map(|c| Checkpoint {
                index: (candlesticks_num as f64 * c.dataset_fraction) as usize,
                passed: false,
                required_longs: c.required_longs,
                required_shorts: c.required_shorts,
                motive: format!(
                    "{process_name} stopped early because the model had less than {} longs or {} shorts at {}% of the dataset.",
                    c.required_longs,
                    c.required_shorts,
                    round_to(c.dataset_fraction * 100.0, 2)
                ),
            })
            .collect();

        EarlyStopping {
            process_name: process_name.to_string(),
            checkpoints,
            min_points: config.min_points,
        }
    }

    /// Candlestick ordinals at which checkpoints are evaluated.
    pub fn checkpoint_indexes(&self) -> Vec<usize> {
        self.checkpoints.iter().map(|c| c.index).collect()
    }
}

impl StopPolicy for EarlyStopping {
    fn check(&mut self, progress: &Progress) -> Option<String> {
        if let Some(min_points) = self.min_points {
            if progress.points <= min_points {
                return Some(format!(
                    "{} stopped early because the model has less than {} points.",
                    self.process_name, min_points
                ));
            }
        }

        for checkpoint in self.checkpoints.iter_mut() {
            if !checkpoint.passed && progress.candlestick_index >= checkpoint.index {
                checkpoint.passed = progress.long_count >= checkpoint.required_longs
                    && progress.short_count >= checkpoint.required_shorts;
                if !checkpoint.passed {
                    return Some(checkpoint.motive.clone());
                }
            }
        }

        None
    }
}
