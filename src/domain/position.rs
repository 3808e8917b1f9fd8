//! Position records and exit checks.

use super::candlestick::Candlestick;
use super::percentage::alter_by_percentage;
use super::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionType {
    Long,
    Short,
}

impl PositionType {
    /// `None` for a neutral signal.
    pub fn from_signal(signal: Signal) -> Option<Self> {
        match signal {
            Signal::Long => Some(PositionType::Long),
            Signal::Short => Some(PositionType::Short),
            Signal::Neutral => None,
        }
    }

    pub fn signal(self) -> Signal {
        match self {
            PositionType::Long => Signal::Long,
            PositionType::Short => Signal::Short,
        }
    }
}

/// The prediction that triggered a position: result, timestamp and the raw
/// per-model values at that index. Stored as given.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub result: Signal,
    pub time: i64,
    pub features: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivePosition {
    pub position_type: PositionType,
    pub prediction: Prediction,
    pub open_time: i64,
    pub open_price: f64,
    pub take_profit_price: f64,
    pub stop_loss_price: f64,
}

/// Why an active position left the market.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exit {
    pub successful: bool,
    pub price: f64,
    pub time: i64,
}

/// `(take_profit, stop_loss)` for a position opened at `open_price`.
pub fn exit_prices(
    position_type: PositionType,
    open_price: f64,
    price_change_requirement: f64,
) -> (f64, f64) {
    let up = alter_by_percentage(open_price, price_change_requirement);
    let down = alter_by_percentage(open_price, -price_change_requirement);
    match position_type {
        PositionType::Long => (up, down),
        PositionType::Short => (down, up),
    }
}

impl ActivePosition {
    /// Opens at the candlestick's open price and open time.
    pub fn open(
        candlestick: &Candlestick,
        position_type: PositionType,
        prediction: Prediction,
        price_change_requirement: f64,
    ) -> Self {
        let (take_profit_price, stop_loss_price) =
            exit_prices(position_type, candlestick.open, price_change_requirement);
        ActivePosition {
            position_type,
            prediction,
            open_time: candlestick.open_time,
            open_price: candlestick.open,
            take_profit_price,
            stop_loss_price,
        }
    }

    pub fn should_stop_loss(&self, candlestick: &Candlestick) -> bool {
        match self.position_type {
            PositionType::Long => candlestick.low <= self.stop_loss_price,
            PositionType::Short => candlestick.high >= self.stop_loss_price,
        }
    }

    pub fn should_take_profit(&self, candlestick: &Candlestick) -> bool {
        match self.position_type {
            PositionType::Long => candlestick.high >= self.take_profit_price,
            PositionType::Short => candlestick.low <= self.take_profit_price,
        }
    }

    /// Checks the bar against the exit prices. The stop loss is evaluated
    /// first, so a bar that reaches both closes the position unsuccessfully.
    pub fn check(&self, candlestick: &Candlestick) -> Option<Exit> {
        if self.should_stop_loss(candlestick) {
            Some(Exit {
                successful: false,
                price: self.stop_loss_price,
                time: candlestick.close_time,
            })
        } else if self.should_take_profit(candlestick) {
            Some(Exit {
                successful: true,
                price: self.take_profit_price,
                time: candlestick.close_time,
            })
        } else {
            None
        }
    }

    pub fn close(self, exit: Exit, balance_after: f64, points_after: f64) -> ClosedPosition {
        ClosedPosition {
            position: self,
            close_time: exit.time,
            close_price: exit.price,
            outcome: exit.successful,
            balance_after,
            points_after,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedPosition {
    pub position: ActivePosition,
    pub close_time: i64,
    pub close_price: f64,
    pub outcome: bool,
    pub balance_after: f64,
    pub points_after: f64,
}

impl ClosedPosition {
    pub fn position_type(&self) -> PositionType {
        self.position.position_type
    }

    pub fn open_time(&self) -> i64 {
        self.position.open_time
    }
}
