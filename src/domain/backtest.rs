//! Backtest engine: the single-position state machine folded over bars.
//!
//! Per bar, in order:
//! 1. when flat and the bar's hour carries a signal, enter long at the open;
//! 2. when long (including a position opened on this bar), update the
//!    high-water mark and trailing stop, then exit on the first of
//!    TP, TSL, SL that the bar's high/low reaches.
//!
//! A position still open when the bars run out is left open; it produces no
//! trade and is reported through [`BacktestResult::open_position`].

use tracing::debug;

use super::error::HourcrossError;
use super::execution::{check_exit, enter_long, exit_levels, exit_long};
use super::feed::validate_bars;
use super::ledger::TradeLedger;
use super::ohlcv::OhlcvBar;
use super::position::{Position, Trade};
use super::signal::SignalSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingStop {
    pub arm_pct: f64,
    pub distance_pct: f64,
}

impl Default for TrailingStop {
    fn default() -> Self {
        TrailingStop {
            arm_pct: 2.0,
            distance_pct: 2.0,
        }
    }
}

/// Parameters of one run. Percentages are plain numbers: `1.5` means 1.5%.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub fee_pct: f64,
    pub slippage_pct: f64,
    /// `None` disables the trailing stop.
    pub trailing: Option<TrailingStop>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            take_profit_pct: 1.5,
            stop_loss_pct: 3.5,
            fee_pct: 0.1,
            slippage_pct: 0.1,
            trailing: Some(TrailingStop::default()),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), HourcrossError> {
        let capital = self.initial_capital;
        if !capital.is_finite() || capital <= 0.0 {
            return Err(invalid_param(format!("initial_capital must be positive, got {capital}")));
        }

        let mut percentages = vec![
            ("take_profit_pct", self.take_profit_pct),
            ("stop_loss_pct", self.stop_loss_pct),
            ("fee_pct", self.fee_pct),
            ("slippage_pct", self.slippage_pct),
        ];
        if let Some(trailing) = &self.trailing {
            percentages.push(("trailing arm_pct", trailing.arm_pct));
            percentages.push(("trailing distance_pct", trailing.distance_pct));
        }

        for (name, value) in percentages {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid_param(format!("{name} must be non-negative, got {value}")));
            }
        }
        Ok(())
    }
}

fn invalid_param(reason: String) -> HourcrossError {
    HourcrossError::InvalidParameter { reason }
}

/// Either all cash and no position, or a position and no cash.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionState {
    Flat { cash: f64 },
    Long(Position),
}

impl PositionState {
    pub fn cash(&self) -> f64 {
        match self {
            PositionState::Flat { cash } => *cash,
            PositionState::Long(_) => 0.0,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            PositionState::Flat { .. } => None,
            PositionState::Long(position) => Some(position),
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat { .. })
    }
}

/// Bar-by-bar driver of one run.
#[derive(Debug, Clone)]
pub struct Backtester<'a> {
    config: &'a BacktestConfig,
    state: PositionState,
    ledger: TradeLedger,
}

impl<'a> Backtester<'a> {
    pub fn new(config: &'a BacktestConfig) -> Self {
        Backtester {
            config,
            state: PositionState::Flat {
                cash: config.initial_capital,
            },
            ledger: TradeLedger::new(),
        }
    }

    pub fn state(&self) -> &PositionState {
        &self.state
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    /// Process one bar. Returns the trade closed on this bar, if any.
    pub fn step(&mut self, bar: &OhlcvBar, signals: &SignalSet) -> Option<Trade> {
        if let PositionState::Flat { cash } = self.state {
            if signals.contains_hour(bar.timestamp) {
                let position = enter_long(cash, bar, self.config);
                debug!(
                    time = %bar.timestamp,
                    price = position.entry_price,
                    shares = position.shares,
                    "entered long"
                );
                self.state = PositionState::Long(position);
            }
        }

        let PositionState::Long(position) = &mut self.state else {
            return None;
        };

        let levels = exit_levels(position, bar, self.config);
        let (reason, trigger_price) = check_exit(&levels, bar)?;
        let exit = exit_long(position, reason, trigger_price, bar.timestamp, self.config);

        let trade = Trade {
            entry_time: position.entry_time,
            exit_time: exit.exit_time,
            entry_price: position.entry_price,
            exit_price: exit.exit_price,
            return_pct: exit.return_pct,
            reason: exit.reason,
        };
        debug!(
            time = %bar.timestamp,
            reason = %trade.reason,
            price = trade.exit_price,
            return_pct = trade.return_pct,
            "exited long"
        );

        self.state = PositionState::Flat {
            cash: exit.proceeds,
        };
        self.ledger.push(trade.clone());
        Some(trade)
    }

    pub fn finish(self) -> BacktestResult {
        BacktestResult {
            ledger: self.ledger,
            final_state: self.state,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub ledger: TradeLedger,
    pub final_state: PositionState,
}

impl BacktestResult {
    /// Position left open when the bars ran out.
    pub fn open_position(&self) -> Option<&Position> {
        self.final_state.position()
    }

    /// Compounded cash after the last exit; `None` while a position is open.
    pub fn final_cash(&self) -> Option<f64> {
        match self.final_state {
            PositionState::Flat { cash } => Some(cash),
            PositionState::Long(_) => None,
        }
    }
}

/// Run the simulation over time-ordered `bars`.
///
/// Parameters and bars are validated up front; bad parameters fail with
/// [`HourcrossError::InvalidParameter`] and malformed bars with
/// [`HourcrossError::InvalidInput`] before any bar is processed. Empty bars
/// or an empty signal set yield an empty ledger.
pub fn run_backtest(
    bars: &[OhlcvBar],
    signals: &SignalSet,
    config: &BacktestConfig,
) -> Result<BacktestResult, HourcrossError> {
    config.validate()?;
    validate_bars(bars)?;

    let mut backtester = Backtester::new(config);
    for bar in bars {
        backtester.step(bar, signals);
    }
    Ok(backtester.finish())
}
