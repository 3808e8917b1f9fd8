#![allow(dead_code)]

use plutus::domain::backtest::BacktestConfig;
use plutus::domain::candlestick::{Candlestick, MINUTE_MS};
use plutus::domain::error::PlutusError;
use plutus::ports::data_port::{DataPort, FeatureFrame};
use std::collections::HashMap;

pub const START: i64 = 1_704_067_200_000;

pub struct MockDataPort {
    pub candlesticks: Vec<Candlestick>,
    pub frame: FeatureFrame,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(candlesticks: Vec<Candlestick>, frame: FeatureFrame) -> Self {
        Self {
            candlesticks,
            frame,
            error: None,
        }
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_candlesticks(&self) -> Result<Vec<Candlestick>, PlutusError> {
        if let Some(reason) = &self.error {
            return Err(PlutusError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.candlesticks.clone())
    }

    fn fetch_features(&self) -> Result<FeatureFrame, PlutusError> {
        Ok(self.frame.clone())
    }
}

pub fn make_candle(minute: usize, open: f64, high: f64, low: f64, close: f64) -> Candlestick {
    let open_time = START + minute as i64 * MINUTE_MS;
    Candlestick {
        open_time,
        close_time: open_time + MINUTE_MS - 1,
        open,
        high,
        low,
        close,
    }
}

/// `n` consecutive minutes that never move from `price`.
pub fn flat_minutes(n: usize, price: f64) -> Vec<Candlestick> {
    (0..n).map(|i| make_candle(i, price, price, price, price)).collect()
}

/// Sets the high of every listed minute, leaving the rest flat.
pub fn with_highs(mut candles: Vec<Candlestick>, minutes: &[usize], high: f64) -> Vec<Candlestick> {
    for &m in minutes {
        candles[m].high = high;
    }
    candles
}

pub fn with_lows(mut candles: Vec<Candlestick>, minutes: &[usize], low: f64) -> Vec<Candlestick> {
    for &m in minutes {
        candles[m].low = low;
    }
    candles
}

/// Two models agreeing on a steadily rising sum: Long once history exists.
pub fn rising_frame(n: usize) -> FeatureFrame {
    FeatureFrame::new(
        (0..n)
            .map(|i| {
                let half = (1.0 + 0.02 * i as f64) / 2.0;
                vec![half, half]
            })
            .collect(),
    )
}

/// Mirror of [`rising_frame`]: Short once history exists.
pub fn falling_frame(n: usize) -> FeatureFrame {
    let rising = rising_frame(n);
    FeatureFrame::new(
        rising
            .features
            .iter()
            .map(|row| row.iter().map(|v| -v).collect())
            .collect(),
    )
}

pub fn minute_indexer(candles: &[Candlestick]) -> HashMap<i64, usize> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| (c.open_time, i))
        .collect()
}

pub fn sample_config(features_num: usize) -> BacktestConfig {
    BacktestConfig {
        position_size: 100.0,
        leverage: 5.0,
        exchange_fee_pct: 0.065,
        idle_minutes_on_close: 0,
        price_change_requirement: 2.0,
        min_increase_sum: 1.0,
        min_decrease_sum: -1.0,
        features_num,
        initial_balance: 150.0,
        early_stopping: None,
    }
}

pub const SAMPLE_INI: &str = r#"
[backtest]
position_size = 100
leverage = 5
exchange_fee = 0.065
idle_minutes_on_close = 0
price_change_requirement = 2.0
min_increase_sum = 1.0
min_decrease_sum = -1.0
"#;
