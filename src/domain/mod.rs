//! Core domain types and logic.

pub mod ohlcv;
pub mod feed;
pub mod ema;
pub mod signal;
pub mod position;
pub mod execution;
pub mod backtest;
pub mod ledger;
pub mod universe;
pub mod config_validation;
pub mod error;
