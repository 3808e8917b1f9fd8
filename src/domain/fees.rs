//! Exchange fee and profit/loss arithmetic for leveraged positions.
//!
//! Every position in a run has the same notional size and the same exit
//! distance, so the six money values are computed once per run.

use super::percentage::{alter_by_percentage, round_to};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeModel {
    pub equity_size: f64,
    pub open_fee: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub successful_close_fee: f64,
    pub unsuccessful_close_fee: f64,
    pub net_profit: f64,
    pub net_loss: f64,
}

impl FeeModel {
    pub fn new(
        position_size: f64,
        leverage: f64,
        exchange_fee_pct: f64,
        price_change_requirement: f64,
    ) -> Self {
        let equity_size = round_to(position_size * leverage, 2);
        let equity_up = alter_by_percentage(equity_size, price_change_requirement);
        let equity_down = alter_by_percentage(equity_size, -price_change_requirement);

        let open_fee = equity_size * exchange_fee_pct / 100.0;
        let gross_profit = equity_up - equity_size;
        let gross_loss = equity_size - equity_down;
        let successful_close_fee = equity_up * exchange_fee_pct / 100.0;
        let unsuccessful_close_fee = equity_down * exchange_fee_pct / 100.0;

        FeeModel {
            equity_size,
            open_fee,
            gross_profit,
            gross_loss,
            successful_close_fee,
            unsuccessful_close_fee,
            net_profit: gross_profit - (open_fee + successful_close_fee),
            net_loss: gross_loss + (open_fee + unsuccessful_close_fee),
        }
    }

    /// Open plus close fee for the given outcome.
    pub fn total_fee(&self, successful: bool) -> f64 {
        if successful {
            self.open_fee + self.successful_close_fee
        } else {
            self.open_fee + self.unsuccessful_close_fee
        }
    }

    /// Signed balance change for the given outcome.
    pub fn balance_delta(&self, successful: bool) -> f64 {
        if successful {
            self.net_profit
        } else {
            -self.net_loss
        }
    }
}
