//! Core domain types and logic.

pub mod percentage;
pub mod candlestick;
pub mod signal;
pub mod position;
pub mod fees;
pub mod performance;
pub mod early_stopping;
pub mod backtest;
pub mod sweep;
pub mod config_validation;
pub mod error;
