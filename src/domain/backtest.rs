//! Backtest engine and event loop.
//!
//! [`BacktestConfig`] holds the run parameters. [`run`] walks the candlesticks
//! once, opening at most one position at a time from the feature-sum signal and
//! settling it against later bars.

use tracing::{debug, info};

use super::candlestick::{add_minutes, Candlestick, MAX_MINUTES};
use super::early_stopping::{EarlyStopping, EarlyStoppingConfig, NeverStop, Progress, StopPolicy};
use super::error::ConfigError;
use super::fees::FeeModel;
use super::percentage::round_to;
use super::performance::{Ledger, Performance, PointsModel, Termination};
use super::position::{ActivePosition, PositionType, Prediction};
use super::signal::{classify_at, SignalThresholds, MIN_HISTORY_INDEX};
use crate::ports::indexer::LookbackIndexer;

/// Name used in early stopping reasons.
pub const PROCESS_NAME: &str = "Backtest";

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub position_size: f64,
    pub leverage: f64,
    pub exchange_fee_pct: f64,
    pub idle_minutes_on_close: i64,
    pub price_change_requirement: f64,
    pub min_increase_sum: f64,
    pub min_decrease_sum: f64,
    /// Number of feature rows the run may read.
    pub features_num: usize,
    pub initial_balance: f64,
    pub early_stopping: Option<EarlyStoppingConfig>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            position_size: 100.0,
            leverage: 5.0,
            exchange_fee_pct: 0.065,
            idle_minutes_on_close: 30,
            price_change_requirement: 2.0,
            min_increase_sum: 1.0,
            min_decrease_sum: -1.0,
            features_num: 0,
            initial_balance: default_initial_balance(100.0),
            early_stopping: None,
        }
    }
}

/// One and a half positions worth of balance, rounded to cents.
pub fn default_initial_balance(position_size: f64) -> f64 {
    round_to(position_size * 1.5, 2)
}

impl BacktestConfig {
    pub fn thresholds(&self) -> SignalThresholds {
        SignalThresholds {
            min_increase_sum: self.min_increase_sum,
            min_decrease_sum: self.min_decrease_sum,
        }
    }

    /// Checks the scalar parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("position_size", self.position_size),
            ("leverage", self.leverage),
            ("initial_balance", self.initial_balance),
            ("price_change_requirement", self.price_change_requirement),
        ];
        for (key, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ConfigError::invalid(key, "must be a positive number"));
            }
        }
        if !(self.exchange_fee_pct >= 0.0) || !self.exchange_fee_pct.is_finite() {
            return Err(ConfigError::invalid("exchange_fee_pct", "must not be negative"));
        }
        if self.idle_minutes_on_close < 0 {
            return Err(ConfigError::invalid("idle_minutes_on_close", "must not be negative"));
        }
        if self.idle_minutes_on_close > MAX_MINUTES {
            return Err(ConfigError::invalid(
                "idle_minutes_on_close",
                "is too large to express in milliseconds",
            ));
        }
        for (key, value) in [
            ("min_increase_sum", self.min_increase_sum),
            ("min_decrease_sum", self.min_decrease_sum),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::invalid(key, "must be a finite number"));
            }
        }
        if self.min_decrease_sum > self.min_increase_sum {
            return Err(ConfigError::invalid(
                "min_decrease_sum",
                "must not be greater than min_increase_sum",
            ));
        }
        if let Some(early_stopping) = &self.early_stopping {
            early_stopping.validate()?;
        }
        Ok(())
    }

    /// Checks the parameters against the feature arrays of a run.
    pub fn validate_for(&self, features: &[Vec<f64>], features_sum: &[f64]) -> Result<(), ConfigError> {
        self.validate()?;
        if features.len() != features_sum.len() {
            return Err(ConfigError::FeatureLengthMismatch {
                features: features.len(),
                features_sum: features_sum.len(),
            });
        }
        if self.features_num > features_sum.len() {
            return Err(ConfigError::FeaturesNumOutOfRange {
                features_num: self.features_num,
                available: features_sum.len(),
            });
        }
        Ok(())
    }
}

/// Where the engine stands between two candlesticks.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineState {
    /// Free to evaluate a signal.
    Idle,
    /// Waiting after a close; no signal is evaluated before `until`.
    Cooldown { until: i64 },
    InPosition(ActivePosition),
}

/// Runs a backtest, stopping early when `config.early_stopping` is set.
pub fn run(
    config: &BacktestConfig,
    candlesticks: &[Candlestick],
    features: &[Vec<f64>],
    features_sum: &[f64],
    indexer: &dyn LookbackIndexer,
) -> Result<Performance, ConfigError> {
    match &config.early_stopping {
        Some(es) => {
            let mut policy = EarlyStopping::new(PROCESS_NAME, candlesticks.len(), es);
            debug!(
                checkpoints = ?policy.checkpoint_indexes(),
                min_points = ?es.min_points,
                "early stopping enabled"
            );
            run_with_policy(config, candlesticks, features, features_sum, indexer, &mut policy)
        }
        None => run_with_policy(config, candlesticks, features, features_sum, indexer, &mut NeverStop),
    }
}

/// Runs a backtest consulting `policy` after every candlestick.
pub fn run_with_policy(
    config: &BacktestConfig,
    candlesticks: &[Candlestick],
    features: &[Vec<f64>],
    features_sum: &[f64],
    indexer: &dyn LookbackIndexer,
    policy: &mut dyn StopPolicy,
) -> Result<Performance, ConfigError> {
    config.validate_for(features, features_sum)?;

    let fees = FeeModel::new(
        config.position_size,
        config.leverage,
        config.exchange_fee_pct,
        config.price_change_requirement,
    );
    let mut ledger = Ledger::new(
        config.initial_balance,
        fees,
        PointsModel::new(config.price_change_requirement),
    );
    let thresholds = config.thresholds();
    let mut state = EngineState::Idle;
    let mut termination = Termination::EndOfData;

    for (ordinal, candlestick) in candlesticks.iter().enumerate() {
        let index = match indexer.index_of(candlestick.open_time) {
            Some(i) if i < config.features_num => i,
            _ => {
                termination = Termination::FeaturesExhausted {
                    open_time: candlestick.open_time,
                };
                break;
            }
        };

        if ledger.current_balance < config.position_size {
            termination = Termination::InsufficientBalance {
                balance: ledger.current_balance,
            };
            break;
        }

        state = match state {
            EngineState::InPosition(position) => match position.check(candlestick) {
                Some(exit) => {
                    let closed = ledger.close(position, exit);
                    debug!(
                        position_type = ?closed.position_type(),
                        outcome = closed.outcome,
                        close_price = closed.close_price,
                        balance = closed.balance_after,
                        points = closed.points_after,
                        "closed position"
                    );
                    EngineState::Cooldown {
                        until: add_minutes(closed.close_time, config.idle_minutes_on_close),
                    }
                }
                None => EngineState::InPosition(position),
            },
            other => other,
        };

        if let EngineState::Cooldown { until } = state {
            if candlestick.open_time >= until {
                state = EngineState::Idle;
            }
        }

        if matches!(state, EngineState::Idle) && index > MIN_HISTORY_INDEX {
            let signal = classify_at(features_sum, index, &thresholds);
            if let Some(position_type) = PositionType::from_signal(signal) {
                let prediction = Prediction {
                    result: signal,
                    time: candlestick.open_time,
                    features: features[index].clone(),
                };
                let position = ActivePosition::open(
                    candlestick,
                    position_type,
                    prediction,
                    config.price_change_requirement,
                );
                debug!(
                    ?position_type,
                    open_time = position.open_time,
                    open_price = position.open_price,
                    take_profit = position.take_profit_price,
                    stop_loss = position.stop_loss_price,
                    "opened position"
                );
                state = EngineState::InPosition(position);
            }
        }

        let progress = Progress {
            candlestick_index: ordinal,
            long_count: ledger.long_count,
            short_count: ledger.short_count,
            points: ledger.points(),
        };
        if let Some(reason) = policy.check(&progress) {
            termination = Termination::EarlyStopped { reason };
            break;
        }
    }

    if let EngineState::InPosition(position) = &state {
        debug!(open_time = position.open_time, "position still open at end of run");
    }

    let performance = ledger.into_performance(config, termination);
    info!(
        positions = performance.position_count(),
        final_balance = performance.final_balance,
        profit = performance.profit,
        accuracy = performance.accuracy,
        termination = %performance.termination,
        "backtest complete"
    );
    Ok(performance)
}
