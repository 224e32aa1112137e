//! Open position tracking and completed trades.

use chrono::{DateTime, FixedOffset};
use std::fmt;

/// The single long position held by the backtester.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub shares: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<FixedOffset>,
    /// Highest bar high seen since entry, entry bar included.
    pub high_water_mark: f64,
    /// Sticky: once set it stays set until the position closes.
    pub trailing_armed: bool,
}

impl Position {
    pub fn new(shares: f64, entry_price: f64, entry_time: DateTime<FixedOffset>, high: f64) -> Self {
        Position {
            shares,
            entry_price,
            entry_time,
            high_water_mark: high,
            trailing_armed: false,
        }
    }

    pub fn update_high_water_mark(&mut self, high: f64) {
        self.high_water_mark = self.high_water_mark.max(high);
    }

    /// Gain of the high-water mark over entry, in percent.
    pub fn high_water_gain_pct(&self) -> f64 {
        (self.high_water_mark / self.entry_price - 1.0) * 100.0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares * price
    }

    pub fn unrealized_return_pct(&self, price: f64) -> f64 {
        (price / self.entry_price - 1.0) * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    TakeProfit,
    TrailingStop,
    StopLoss,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "TP",
            ExitReason::TrailingStop => "TSL",
            ExitReason::StopLoss => "SL",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry_time: DateTime<FixedOffset>,
    pub exit_time: DateTime<FixedOffset>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub return_pct: f64,
    pub reason: ExitReason,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.return_pct > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn entry_time() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-09-01T10:00:00+02:00").unwrap()
    }

    fn sample_position() -> Position {
        Position::new(100.0, 50.0, entry_time(), 51.0)
    }

    #[test]
    fn new_position_starts_unarmed_at_entry_high() {
        let pos = sample_position();
        assert!(!pos.trailing_armed);
        assert_relative_eq!(pos.high_water_mark, 51.0);
    }

    #[test]
    fn high_water_mark_only_rises() {
        let mut pos = sample_position();
        pos.update_high_water_mark(55.0);
        pos.update_high_water_mark(52.0);
        assert_relative_eq!(pos.high_water_mark, 55.0);
    }

    #[test]
    fn high_water_gain() {
        let mut pos = sample_position();
        pos.update_high_water_mark(55.0);
        assert_relative_eq!(pos.high_water_gain_pct(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn market_value_and_unrealized_return() {
        let pos = sample_position();
        assert_relative_eq!(pos.market_value(55.0), 5500.0);
        assert_relative_eq!(pos.unrealized_return_pct(45.0), -10.0, epsilon = 1e-9);
    }

    #[test]
    fn exit_reason_labels() {
        assert_eq!(ExitReason::TakeProfit.to_string(), "TP");
        assert_eq!(ExitReason::TrailingStop.to_string(), "TSL");
        assert_eq!(ExitReason::StopLoss.to_string(), "SL");
    }

    #[test]
    fn trade_win_requires_positive_return() {
        let mut trade = Trade {
            entry_time: entry_time(),
            exit_time: entry_time(),
            entry_price: 50.0,
            exit_price: 50.0,
            return_pct: 0.0,
            reason: ExitReason::StopLoss,
        };
        assert!(!trade.is_win());
        trade.return_pct = 0.01;
        assert!(trade.is_win());
    }
}
