#![allow(dead_code)]

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use hourcross::domain::backtest::BacktestConfig;
use hourcross::domain::error::HourcrossError;
pub use hourcross::domain::ohlcv::{OhlcvBar, Timeframe};
use hourcross::ports::data_port::DataPort;
use std::collections::HashMap;

/// In-memory bars keyed by symbol and timeframe. Returns stored bars as-is,
/// ignoring the requested window.
pub struct MockDataPort {
    pub data: HashMap<(String, Timeframe), Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, timeframe: Timeframe, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert((symbol.to_string(), timeframe), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        _start: NaiveDate,
        _end: NaiveDate,
        _warmup_bars: u32,
    ) -> Result<Vec<OhlcvBar>, HourcrossError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(HourcrossError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(&(symbol.to_string(), timeframe))
            .cloned()
            .unwrap_or_default())
    }
}

pub fn utc_plus_two() -> FixedOffset {
    FixedOffset::east_opt(2 * 3600).unwrap()
}

pub fn ts(rfc3339: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap()
}

/// 2025-09-01 10:00 at UTC+2.
pub fn t0() -> DateTime<FixedOffset> {
    ts("2025-09-01T10:00:00+02:00")
}

pub fn bar(
    timestamp: DateTime<FixedOffset>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
) -> OhlcvBar {
    OhlcvBar {
        timestamp,
        open,
        high,
        low,
        close,
        volume: 1_000.0,
    }
}

pub fn minute_bar(minute: i64, open: f64, high: f64, low: f64, close: f64) -> OhlcvBar {
    bar(t0() + Duration::minutes(minute), open, high, low, close)
}

/// Flat minute bars at `price`, `count` of them from `t0() + start_minute`.
pub fn flat_minutes(start_minute: i64, count: i64, price: f64) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| minute_bar(start_minute + i, price, price, price, price))
        .collect()
}

/// One hourly bar per close, the first at `start`.
pub fn hourly_from_closes(start: DateTime<FixedOffset>, closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| bar(start + Duration::hours(i as i64), c, c, c, c))
        .collect()
}

/// Hourly closes falling for `down` bars then jumping, so the fast EMA
/// crosses above the slow one exactly on the last bar.
pub fn crossover_closes(down: usize) -> Vec<f64> {
    let mut closes: Vec<f64> = (0..down).map(|i| 100.0 - i as f64 * 0.5).collect();
    closes.push(150.0);
    closes
}

pub fn frictionless_config() -> BacktestConfig {
    BacktestConfig {
        initial_capital: 10_000.0,
        take_profit_pct: 1.5,
        stop_loss_pct: 3.5,
        fee_pct: 0.0,
        slippage_pct: 0.0,
        trailing: None,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
