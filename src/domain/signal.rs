//! Trend classification over a window of feature sums.
//!
//! The classifier looks at the last six feature sums `[s(-5) .. s(0)]` and
//! combines a strict-monotonic trend check with an intensity score that
//! compares `s(-5)` against `s(0)`.

use super::percentage::percentage_change;

/// Number of feature sums a classification needs.
pub const WINDOW: usize = 6;

/// Bars at or below this index are always Neutral.
pub const MIN_HISTORY_INDEX: usize = WINDOW - 1;

const STRONG_INTENSITY_PCT: f64 = 8.0;
const WEAK_INTENSITY_PCT: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Long,
    Short,
    Neutral,
}

impl Signal {
    /// `1`, `-1` or `0`.
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Long => 1,
            Signal::Short => -1,
            Signal::Neutral => 0,
        }
    }
}

/// Thresholds separating actionable sums from noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalThresholds {
    pub min_increase_sum: f64,
    pub min_decrease_sum: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trend {
    pub increasing: bool,
    pub increasing_strongly: bool,
    pub decreasing: bool,
    pub decreasing_strongly: bool,
}

impl Trend {
    pub fn of(sums: &[f64; WINDOW]) -> Self {
        let last_four = &sums[WINDOW - 4..];
        Trend {
            increasing: strictly(last_four, |a, b| b > a),
            increasing_strongly: strictly(sums, |a, b| b > a),
            decreasing: strictly(last_four, |a, b| b < a),
            decreasing_strongly: strictly(sums, |a, b| b < a),
        }
    }
}

fn strictly(values: &[f64], cmp: impl Fn(f64, f64) -> bool) -> bool {
    values.windows(2).all(|w| cmp(w[0], w[1]))
}

/// Intensity in `-2..=2` of the move from `initial` to `current`.
///
/// For a positive start the sign follows the percentage change. For a
/// negative start the percentage change has the opposite sign of the move,
/// so rising toward (or through) zero scores bullish and falling further
/// below zero scores bearish.
pub fn intensity(initial: f64, current: f64) -> i8 {
    if initial > 0.0 {
        band(percentage_change(initial, current))
    } else if initial < 0.0 {
        band(-percentage_change(initial, current))
    } else {
        0
    }
}

fn band(change: f64) -> i8 {
    if change >= STRONG_INTENSITY_PCT {
        2
    } else if change >= WEAK_INTENSITY_PCT {
        1
    } else if change <= -STRONG_INTENSITY_PCT {
        -2
    } else if change <= -WEAK_INTENSITY_PCT {
        -1
    } else {
        0
    }
}

/// Classifies a window of six sums, oldest first.
pub fn classify(sums: &[f64; WINDOW], thresholds: &SignalThresholds) -> Signal {
    let current = sums[WINDOW - 1];
    let trend = Trend::of(sums);
    let intensity = intensity(sums[0], current);
    let above_increase = current >= thresholds.min_increase_sum;
    let below_decrease = current <= thresholds.min_decrease_sum;

    if (above_increase && trend.increasing && intensity >= 1)
        || (below_decrease && trend.increasing_strongly && intensity >= 2)
    {
        Signal::Long
    } else if (below_decrease && trend.decreasing && intensity <= -1)
        || (above_increase && trend.decreasing_strongly && intensity <= -2)
    {
        Signal::Short
    } else {
        Signal::Neutral
    }
}

/// Classifies the bar at `index`, reading `features_sum[index-5 ..= index]`.
///
/// Returns Neutral until six sums of history exist or when `index` is out of bounds.
pub fn classify_at(features_sum: &[f64], index: usize, thresholds: &SignalThresholds) -> Signal {
    if index <= MIN_HISTORY_INDEX || index >= features_sum.len() {
        return Signal::Neutral;
    }
    let mut window = [0.0; WINDOW];
    window.copy_from_slice(&features_sum[index + 1 - WINDOW..=index]);
    classify(&window, thresholds)
}
