//! Running account state and the final performance report.

use std::fmt;

use super::backtest::BacktestConfig;
use super::fees::FeeModel;
use super::percentage::{
    alter_by_percentage, count_or_one, percentage_change, percentage_of_total, round_to,
};
use super::position::{ActivePosition, ClosedPosition, Exit, PositionType};

/// Haircut applied to point rewards and added to point penalties.
pub const POINTS_FEE_PCT: f64 = 10.0;

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    /// Every candlestick was processed.
    EndOfData,
    /// A candlestick mapped past the available feature rows (or had no index).
    FeaturesExhausted { open_time: i64 },
    /// The balance dropped below the position size.
    InsufficientBalance { balance: f64 },
    /// The stop policy aborted the run.
    EarlyStopped { reason: String },
}

impl Termination {
    pub fn early_stopping_reason(&self) -> Option<&str> {
        match self {
            Termination::EarlyStopped { reason } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::EndOfData => write!(f, "end of data"),
            Termination::FeaturesExhausted { open_time } => {
                write!(f, "no feature row for candlestick {open_time}")
            }
            Termination::InsufficientBalance { balance } => {
                write!(f, "insufficient balance ({balance:.2})")
            }
            Termination::EarlyStopped { reason } => write!(f, "{reason}"),
        }
    }
}

/// Points earned by a position outcome, independent of money.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointsModel {
    pub reward: f64,
    pub penalty: f64,
}

impl PointsModel {
    pub fn new(price_change_requirement: f64) -> Self {
        PointsModel {
            reward: alter_by_percentage(price_change_requirement, -POINTS_FEE_PCT),
            penalty: -alter_by_percentage(price_change_requirement, POINTS_FEE_PCT),
        }
    }

    pub fn outcome_points(&self, successful: bool) -> f64 {
        if successful { self.reward } else { self.penalty }
    }
}

/// Mutable bookkeeping for one run. Only [`Ledger::close`] moves money.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub fees: FeeModel,
    pub points_model: PointsModel,
    pub initial_balance: f64,
    pub current_balance: f64,
    pub accumulated_fees: f64,
    pub closed_positions: Vec<ClosedPosition>,
    pub long_count: usize,
    pub long_success_count: usize,
    pub short_count: usize,
    pub short_success_count: usize,
    pub points_history: Vec<f64>,
}

impl Ledger {
    pub fn new(initial_balance: f64, fees: FeeModel, points_model: PointsModel) -> Self {
        Ledger {
            fees,
            points_model,
            initial_balance,
            current_balance: initial_balance,
            accumulated_fees: 0.0,
            closed_positions: Vec::new(),
            long_count: 0,
            long_success_count: 0,
            short_count: 0,
            short_success_count: 0,
            points_history: vec![0.0],
        }
    }

    pub fn points(&self) -> f64 {
        self.points_history.last().copied().unwrap_or(0.0)
    }

    pub fn position_count(&self) -> usize {
        self.long_count + self.short_count
    }

    /// Settles a position: balance, fees, points and counters.
    pub fn close(&mut self, position: ActivePosition, exit: Exit) -> &ClosedPosition {
        let successful = exit.successful;
        self.current_balance += self.fees.balance_delta(successful);
        self.accumulated_fees += self.fees.total_fee(successful);

        let points = round_to(
            self.points() + self.points_model.outcome_points(successful),
            2,
        );
        self.points_history.push(points);

        match position.position_type {
            PositionType::Long => {
                self.long_count += 1;
                if successful {
                    self.long_success_count += 1;
                }
            }
            PositionType::Short => {
                self.short_count += 1;
                if successful {
                    self.short_success_count += 1;
                }
            }
        }

        let closed = position.close(exit, self.current_balance, points);
        self.closed_positions.push(closed);
        &self.closed_positions[self.closed_positions.len() - 1]
    }

    pub fn into_performance(self, config: &BacktestConfig, termination: Termination) -> Performance {
        let total = self.position_count();
        let successful = self.long_success_count + self.short_success_count;
        let largest_balance_drawdown =
            calculate_largest_balance_drawdown(self.initial_balance, &self.closed_positions);
        let points = self.points();
        let points_median = median(&self.points_history);

        Performance {
            position_size: config.position_size,
            leverage: config.leverage,
            exchange_fee_pct: config.exchange_fee_pct,
            idle_minutes_on_close: config.idle_minutes_on_close,
            price_change_requirement: config.price_change_requirement,
            min_increase_sum: config.min_increase_sum,
            min_decrease_sum: config.min_decrease_sum,
            initial_balance: self.initial_balance,
            final_balance: self.current_balance,
            profit: self.current_balance - self.initial_balance,
            fees: self.accumulated_fees,
            long_count: self.long_count,
            long_success_count: self.long_success_count,
            short_count: self.short_count,
            short_success_count: self.short_success_count,
            increase_outcome_count: self.long_success_count
                + (self.short_count - self.short_success_count),
            decrease_outcome_count: self.short_success_count
                + (self.long_count - self.long_success_count),
            long_accuracy: percentage_of_total(
                self.long_success_count as f64,
                count_or_one(self.long_count),
            ),
            short_accuracy: percentage_of_total(
                self.short_success_count as f64,
                count_or_one(self.short_count),
            ),
            accuracy: percentage_of_total(successful as f64, count_or_one(total)),
            largest_balance_drawdown,
            points,
            points_median,
            points_history: self.points_history,
            positions: self.closed_positions,
            termination,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Performance {
    pub position_size: f64,
    pub leverage: f64,
    pub exchange_fee_pct: f64,
    pub idle_minutes_on_close: i64,
    pub price_change_requirement: f64,
    pub min_increase_sum: f64,
    pub min_decrease_sum: f64,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub profit: f64,
    pub fees: f64,
    pub positions: Vec<ClosedPosition>,
    pub long_count: usize,
    pub long_success_count: usize,
    pub short_count: usize,
    pub short_success_count: usize,
    /// Positions where price went up, whatever the model predicted.
    pub increase_outcome_count: usize,
    /// Positions where price went down, whatever the model predicted.
    pub decrease_outcome_count: usize,
    pub long_accuracy: f64,
    pub short_accuracy: f64,
    pub accuracy: f64,
    pub largest_balance_drawdown: f64,
    pub points: f64,
    pub points_history: Vec<f64>,
    pub points_median: f64,
    pub termination: Termination,
}

impl Performance {
    pub fn position_count(&self) -> usize {
        self.long_count + self.short_count
    }

    pub fn is_profitable(&self) -> bool {
        self.profit > 0.0
    }

    pub fn early_stopping(&self) -> Option<&str> {
        self.termination.early_stopping_reason()
    }
}

/// Most negative percentage decline from any balance to the lowest balance
/// that follows it. `0.0` with fewer than two balance points.
pub fn calculate_largest_balance_drawdown(
    initial_balance: f64,
    closed_positions: &[ClosedPosition],
) -> f64 {
    let balances: Vec<f64> = std::iter::once(initial_balance)
        .chain(closed_positions.iter().map(|p| p.balance_after))
        .collect();
    balance_drawdown(&balances)
}

fn balance_drawdown(balances: &[f64]) -> f64 {
    if balances.len() < 2 {
        return 0.0;
    }

    // Suffix minimums so each start point is compared against the lowest later balance.
    let mut lowest_after = vec![f64::INFINITY; balances.len()];
    for i in (0..balances.len() - 1).rev() {
        lowest_after[i] = balances[i + 1].min(lowest_after[i + 1]);
    }

    balances[..balances.len() - 1]
        .iter()
        .zip(&lowest_after)
        .map(|(&balance, &lowest)| percentage_change(balance, lowest))
        .fold(f64::INFINITY, f64::min)
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    let value = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };
    round_to(value, 2)
}
