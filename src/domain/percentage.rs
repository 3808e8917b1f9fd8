//! Percentage helpers shared by the fee model, the classifier and the report.
//!
//! None of these round. Callers round where a value becomes part of the
//! account (initial balance, equity size, points).

/// Applies a percentage to a value: `value * (1 + pct / 100)`.
///
/// A negative `pct` decreases the value, e.g. `alter_by_percentage(100.0, -5.0) == 95.0`.
pub fn alter_by_percentage(value: f64, pct: f64) -> f64 {
    value * (1.0 + pct / 100.0)
}

/// Percentage change from `from` to `to`. A zero base yields `0.0`.
pub fn percentage_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    (to - from) / from * 100.0
}

/// `n` as a percentage of `total`.
///
/// Callers substitute `1` for a zero total so empty counters report `0%`.
pub fn percentage_of_total(n: f64, total: f64) -> f64 {
    n / total * 100.0
}

/// Divisor guard used by the accuracy fields: a zero count becomes one.
pub fn count_or_one(count: usize) -> f64 {
    if count > 0 { count as f64 } else { 1.0 }
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
