//! Parallel parameter sweep.
//!
//! Builds the cartesian product of the sweep axes, runs one backtest per
//! combination on the rayon pool and returns the results best profit first.
//! Every run borrows the same candlesticks and features.

use std::fmt;

use rayon::prelude::*;
use tracing::info;

use super::backtest::{self, BacktestConfig};
use super::candlestick::{Candlestick, MAX_MINUTES};
use super::error::ConfigError;
use super::performance::Performance;
use crate::ports::indexer::LookbackIndexer;

/// Run parameter a sweep axis can vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepParameter {
    PriceChangeRequirement,
    MinIncreaseSum,
    MinDecreaseSum,
    IdleMinutesOnClose,
    Leverage,
}

impl SweepParameter {
    pub const ALL: [SweepParameter; 5] = [
        SweepParameter::PriceChangeRequirement,
        SweepParameter::MinIncreaseSum,
        SweepParameter::MinDecreaseSum,
        SweepParameter::IdleMinutesOnClose,
        SweepParameter::Leverage,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SweepParameter::PriceChangeRequirement => "price_change_requirement",
            SweepParameter::MinIncreaseSum => "min_increase_sum",
            SweepParameter::MinDecreaseSum => "min_decrease_sum",
            SweepParameter::IdleMinutesOnClose => "idle_minutes_on_close",
            SweepParameter::Leverage => "leverage",
        }
    }

    fn apply(self, config: &mut BacktestConfig, value: f64) {
        match self {
            SweepParameter::PriceChangeRequirement => config.price_change_requirement = value,
            SweepParameter::MinIncreaseSum => config.min_increase_sum = value,
            SweepParameter::MinDecreaseSum => config.min_decrease_sum = value,
            SweepParameter::IdleMinutesOnClose => config.idle_minutes_on_close = value as i64,
            SweepParameter::Leverage => config.leverage = value,
        }
    }
}

impl fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepAxis {
    pub parameter: SweepParameter,
    pub values: Vec<f64>,
}

impl SweepAxis {
    /// Rejects values the parameter cannot take as given. Idle minutes must
    /// be whole, non-negative and within millisecond range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let key = self.parameter.key();
        for &value in &self.values {
            if !value.is_finite() {
                return Err(ConfigError::invalid(key, "sweep values must be finite"));
            }
            if self.parameter == SweepParameter::IdleMinutesOnClose
                && (value < 0.0 || value.fract() != 0.0 || value > MAX_MINUTES as f64)
            {
                return Err(ConfigError::invalid(
                    key,
                    "sweep values must be whole non-negative minutes",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    pub config_id: String,
    pub overrides: Vec<(SweepParameter, f64)>,
    pub performance: Performance,
}

fn generate_combinations(axes: &[SweepAxis]) -> Vec<Vec<(SweepParameter, f64)>> {
    let Some((first, rest)) = axes.split_first() else {
        return vec![vec![]];
    };

    let sub = generate_combinations(rest);
    let mut result = Vec::with_capacity(first.values.len() * sub.len());
    for &value in &first.values {
        for combo in &sub {
            let mut new_combo = Vec::with_capacity(combo.len() + 1);
            new_combo.push((first.parameter, value));
            new_combo.extend(combo.iter().copied());
            result.push(new_combo);
        }
    }
    result
}

fn apply_overrides(base: &BacktestConfig, overrides: &[(SweepParameter, f64)]) -> BacktestConfig {
    let mut config = base.clone();
    for &(parameter, value) in overrides {
        parameter.apply(&mut config, value);
    }
    config
}

/// Runs every combination of `axes` over `base`.
///
/// All combinations are validated before any run starts; one invalid
/// combination rejects the whole sweep.
pub fn run_sweep(
    base: &BacktestConfig,
    axes: &[SweepAxis],
    candlesticks: &[Candlestick],
    features: &[Vec<f64>],
    features_sum: &[f64],
    indexer: &(dyn LookbackIndexer + Sync),
) -> Result<Vec<SweepResult>, ConfigError> {
    for axis in axes {
        axis.validate()?;
    }
    let configs: Vec<_> = generate_combinations(axes)
        .into_iter()
        .map(|overrides| (apply_overrides(base, &overrides), overrides))
        .collect();
    for (config, _) in &configs {
        config.validate_for(features, features_sum)?;
    }
    info!(combinations = configs.len(), axes = axes.len(), "starting sweep");

    let mut results = configs
        .into_par_iter()
        .enumerate()
        .map(|(i, (config, overrides))| -> Result<SweepResult, ConfigError> {
            let performance =
                backtest::run(&config, candlesticks, features, features_sum, indexer)?;
            Ok(SweepResult {
                config_id: format!("sweep_{i:04}"),
                overrides,
                performance,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    results.sort_by(|a, b| b.performance.profit.total_cmp(&a.performance.profit));
    Ok(results)
}
