//! Trade execution and fill simulation.
//!
//! Implements entry/exit fills with slippage and percentage fees, full-cash
//! sizing, and take-profit / trailing-stop / stop-loss trigger checking.

use chrono::{DateTime, FixedOffset};

use super::backtest::{BacktestConfig, TrailingStop};
use super::ohlcv::OhlcvBar;
use super::position::{ExitReason, Position};

/// Exit rules in the order they are tried on a bar. When one bar breaches
/// several levels the first rule listed here decides the exit.
pub const EXIT_PRIORITY: [ExitReason; 3] = [
    ExitReason::TakeProfit,
    ExitReason::TrailingStop,
    ExitReason::StopLoss,
];

/// Long entry (buy): execution_price = market_price * (1 + slippage_pct / 100)
pub fn apply_slippage_long_entry(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Long exit (sell): execution_price = market_price * (1 - slippage_pct / 100)
pub fn apply_slippage_long_exit(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

/// Shares bought with all of `cash`, the fee charged on top of the fill price.
pub fn shares_for_cash(cash: f64, fill_price: f64, fee_pct: f64) -> f64 {
    cash / (fill_price * (1.0 + fee_pct / 100.0))
}

/// Cash realized by selling `shares` at `fill_price`, net of the fee.
pub fn sale_proceeds(shares: f64, fill_price: f64, fee_pct: f64) -> f64 {
    shares * fill_price * (1.0 - fee_pct / 100.0)
}

/// Open a long position with all available cash at the bar's open.
pub fn enter_long(cash: f64, bar: &OhlcvBar, config: &BacktestConfig) -> Position {
    let fill_price = apply_slippage_long_entry(bar.open, config.slippage_pct);
    let shares = shares_for_cash(cash, fill_price, config.fee_pct);
    Position::new(shares, fill_price, bar.timestamp, bar.high)
}

/// Price levels an open position can exit at on the current bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitLevels {
    pub take_profit: f64,
    pub stop_loss: f64,
    /// Present only once the trailing stop is armed.
    pub trailing_stop: Option<f64>,
}

impl ExitLevels {
    /// Price the rule fires at on `bar`, if it fires.
    pub fn trigger(&self, reason: ExitReason, bar: &OhlcvBar) -> Option<f64> {
        match reason {
            ExitReason::TakeProfit => (bar.high >= self.take_profit).then_some(self.take_profit),
            ExitReason::TrailingStop => self.trailing_stop.filter(|&price| bar.low <= price),
            ExitReason::StopLoss => (bar.low <= self.stop_loss).then_some(self.stop_loss),
        }
    }
}

/// Arm the trailing stop when the high-water gain reaches the arm threshold
/// and return the trailing level while armed.
///
/// The level sits `distance_pct` below the high-water gain, measured in
/// percent of the entry price.
pub fn update_trailing_stop(position: &mut Position, trailing: &TrailingStop) -> Option<f64> {
    let gain_pct = position.high_water_gain_pct();
    if gain_pct >= trailing.arm_pct {
        position.trailing_armed = true;
    }
    position
        .trailing_armed
        .then(|| position.entry_price * (1.0 + (gain_pct - trailing.distance_pct) / 100.0))
}

/// Refresh the position with `bar` (high-water mark, trailing arming) and
/// compute the levels it can exit at.
pub fn exit_levels(position: &mut Position, bar: &OhlcvBar, config: &BacktestConfig) -> ExitLevels {
    position.update_high_water_mark(bar.high);

    let take_profit = position.entry_price * (1.0 + config.take_profit_pct / 100.0);
    let stop_loss = position.entry_price * (1.0 - config.stop_loss_pct / 100.0);
    let trailing_stop = config
        .trailing
        .as_ref()
        .and_then(|trailing| update_trailing_stop(position, trailing));

    ExitLevels {
        take_profit,
        stop_loss,
        trailing_stop,
    }
}

/// First exit rule in [`EXIT_PRIORITY`] that fires on `bar`, with its price.
pub fn check_exit(levels: &ExitLevels, bar: &OhlcvBar) -> Option<(ExitReason, f64)> {
    EXIT_PRIORITY
        .iter()
        .find_map(|&reason| levels.trigger(reason, bar).map(|price| (reason, price)))
}

/// Result of closing the position.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub reason: ExitReason,
    pub exit_time: DateTime<FixedOffset>,
    pub exit_price: f64,
    pub proceeds: f64,
    pub return_pct: f64,
}

/// Close `position` at `trigger_price`, slipping against the sell side.
pub fn exit_long(
    position: &Position,
    reason: ExitReason,
    trigger_price: f64,
    exit_time: DateTime<FixedOffset>,
    config: &BacktestConfig,
) -> ExitResult {
    let exit_price = apply_slippage_long_exit(trigger_price, config.slippage_pct);
    ExitResult {
        reason,
        exit_time,
        exit_price,
        proceeds: sale_proceeds(position.shares, exit_price, config.fee_pct),
        return_pct: (exit_price / position.entry_price - 1.0) * 100.0,
    }
}
