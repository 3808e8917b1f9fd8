//! Configuration validation and construction.
//!
//! Validates the `[backtest]`, `[early_stopping]` and `[sweep]` sections and
//! turns them into domain values.

use crate::domain::backtest::{default_initial_balance, BacktestConfig};
use crate::domain::candlestick::MAX_MINUTES;
use crate::domain::early_stopping::{CheckpointConfig, EarlyStoppingConfig};
use crate::domain::error::{ConfigError, PlutusError};
use crate::domain::sweep::{SweepAxis, SweepParameter};
use crate::ports::config_port::ConfigPort;

pub const BACKTEST: &str = "backtest";
pub const EARLY_STOPPING: &str = "early_stopping";
pub const SWEEP: &str = "sweep";

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> PlutusError {
    PlutusError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), PlutusError> {
    validate_required(config)?;
    for key in ["position_size", "leverage", "price_change_requirement"] {
        validate_positive(config, key)?;
    }
    if config.has_key(BACKTEST, "initial_balance") {
        validate_positive(config, "initial_balance")?;
    }
    validate_exchange_fee(config)?;
    validate_idle_minutes(config)?;
    validate_thresholds(config)?;
    validate_features_num(config)?;
    parse_early_stopping(config)?;
    Ok(())
}

fn validate_required(config: &dyn ConfigPort) -> Result<(), PlutusError> {
    for key in [
        "position_size",
        "leverage",
        "price_change_requirement",
        "min_increase_sum",
        "min_decrease_sum",
    ] {
        if !config.has_key(BACKTEST, key) {
            return Err(PlutusError::ConfigMissing {
                section: BACKTEST.to_string(),
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_positive(config: &dyn ConfigPort, key: &str) -> Result<(), PlutusError> {
    let value = config.get_double(BACKTEST, key, 0.0);
    if !(value > 0.0) || !value.is_finite() {
        return Err(invalid(BACKTEST, key, format!("{key} must be positive")));
    }
    Ok(())
}

fn validate_exchange_fee(config: &dyn ConfigPort) -> Result<(), PlutusError> {
    let value = config.get_double(BACKTEST, "exchange_fee", 0.0);
    if value < 0.0 {
        return Err(invalid(BACKTEST, "exchange_fee", "exchange_fee must be non-negative"));
    }
    Ok(())
}

fn validate_idle_minutes(config: &dyn ConfigPort) -> Result<(), PlutusError> {
    let key = "idle_minutes_on_close";
    let Some(raw) = config.get_string(BACKTEST, key).filter(|s| !s.trim().is_empty()) else {
        return Ok(());
    };
    let bad = |reason: &str| invalid(BACKTEST, key, format!("{key} {reason}"));
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| bad("must be a whole number of minutes"))?;
    if value < 0 {
        return Err(bad("must be non-negative"));
    }
    if value > MAX_MINUTES {
        return Err(bad("is too large to express in milliseconds"));
    }
    Ok(())
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), PlutusError> {
    let increase = config.get_double(BACKTEST, "min_increase_sum", 0.0);
    let decrease = config.get_double(BACKTEST, "min_decrease_sum", 0.0);
    for (key, value) in [("min_increase_sum", increase), ("min_decrease_sum", decrease)] {
        if !value.is_finite() {
            return Err(invalid(BACKTEST, key, format!("{key} must be a finite number")));
        }
    }
    if decrease > increase {
        return Err(invalid(
            BACKTEST,
            "min_decrease_sum",
            "min_decrease_sum must not exceed min_increase_sum",
        ));
    }
    Ok(())
}

fn validate_features_num(config: &dyn ConfigPort) -> Result<(), PlutusError> {
    if config.has_key(BACKTEST, "features_num")
        && config.get_int(BACKTEST, "features_num", -1) < 0
    {
        return Err(invalid(
            BACKTEST,
            "features_num",
            "features_num must be a non-negative integer",
        ));
    }
    Ok(())
}

/// Builds a validated [`BacktestConfig`].
///
/// `features_num` defaults to `available_rows` and `initial_balance` to one
/// and a half position sizes.
pub fn build_backtest_config(
    config: &dyn ConfigPort,
    available_rows: usize,
) -> Result<BacktestConfig, PlutusError> {
    validate_backtest_config(config)?;

    let position_size = config.get_double(BACKTEST, "position_size", 0.0);
    let features_num = if config.has_key(BACKTEST, "features_num") {
        config.get_int(BACKTEST, "features_num", 0) as usize
    } else {
        available_rows
    };

    Ok(BacktestConfig {
        position_size,
        leverage: config.get_double(BACKTEST, "leverage", 1.0),
        exchange_fee_pct: config.get_double(BACKTEST, "exchange_fee", 0.0),
        idle_minutes_on_close: config.get_int(BACKTEST, "idle_minutes_on_close", 0),
        price_change_requirement: config.get_double(BACKTEST, "price_change_requirement", 0.0),
        min_increase_sum: config.get_double(BACKTEST, "min_increase_sum", 0.0),
        min_decrease_sum: config.get_double(BACKTEST, "min_decrease_sum", 0.0),
        features_num,
        initial_balance: config.get_double(
            BACKTEST,
            "initial_balance",
            default_initial_balance(position_size),
        ),
        early_stopping: parse_early_stopping(config)?,
    })
}

/// `None` unless `[early_stopping] enabled = true`.
pub fn parse_early_stopping(
    config: &dyn ConfigPort,
) -> Result<Option<EarlyStoppingConfig>, PlutusError> {
    if !config.get_bool(EARLY_STOPPING, "enabled", false) {
        return Ok(None);
    }

    let defaults = EarlyStoppingConfig::default();
    let checkpoints = match config.get_string(EARLY_STOPPING, "checkpoints") {
        Some(s) => parse_checkpoints(&s)?,
        None => defaults.checkpoints,
    };
    let min_points = match config.get_string(EARLY_STOPPING, "min_points") {
        Some(s) if s.trim().eq_ignore_ascii_case("none") => None,
        Some(s) => Some(
            s.trim()
                .parse::<f64>()
                .map_err(|_| invalid(EARLY_STOPPING, "min_points", "min_points must be a number"))?,
        ),
        None => defaults.min_points,
    };

    let es = EarlyStoppingConfig {
        checkpoints,
        min_points,
    };
    es.validate()
        .map_err(|e| invalid(EARLY_STOPPING, "checkpoints", e.to_string()))?;
    Ok(Some(es))
}

/// Parses `fraction:longs:shorts` entries separated by commas.
pub fn parse_checkpoints(value: &str) -> Result<Vec<CheckpointConfig>, PlutusError> {
    let bad = |entry: &str| {
        invalid(
            EARLY_STOPPING,
            "checkpoints",
            format!("expected fraction:longs:shorts, got '{entry}'"),
        )
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            let [fraction, longs, shorts] = parts.as_slice() else {
                return Err(bad(entry));
            };
            Ok(CheckpointConfig {
                dataset_fraction: fraction.parse().map_err(|_| bad(entry))?,
                required_longs: longs.parse().map_err(|_| bad(entry))?,
                required_shorts: shorts.parse().map_err(|_| bad(entry))?,
            })
        })
        .collect()
}

/// Reads one axis per sweepable `[sweep]` key, each a comma list of values.
pub fn parse_sweep_axes(config: &dyn ConfigPort) -> Result<Vec<SweepAxis>, PlutusError> {
    let mut axes = Vec::new();
    for parameter in SweepParameter::ALL {
        let Some(raw) = config.get_string(SWEEP, parameter.key()) else {
            continue;
        };
        let values = parse_values(&raw).map_err(|entry| {
            invalid(
                SWEEP,
                parameter.key(),
                format!("'{entry}' is not a number"),
            )
        })?;
        if !values.is_empty() {
            let axis = SweepAxis { parameter, values };
            axis.validate().map_err(|err| match err {
                ConfigError::Invalid { reason, .. } => invalid(SWEEP, parameter.key(), reason),
                other => other.into(),
            })?;
            axes.push(axis);
        }
    }

    if axes.is_empty() {
        return Err(PlutusError::ConfigMissing {
            section: SWEEP.to_string(),
            key: SweepParameter::PriceChangeRequirement.key().to_string(),
        });
    }
    Ok(axes)
}

fn parse_values(raw: &str) -> Result<Vec<f64>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().map_err(|_| s.to_string()))
        .collect()
}
