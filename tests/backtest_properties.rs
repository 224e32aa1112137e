//! Property tests for backtest invariants.
//!
//! Uses proptest to verify:
//! 1. Determinism: identical inputs give identical results
//! 2. Cash/position complement holds after every bar
//! 3. Entries only happen inside signal hours, exits never precede entries
//! 4. Frictionless TP/SL trades return exactly the configured percentages

mod common;

use approx::relative_eq;
use chrono::Duration;
use common::*;
use hourcross::domain::backtest::{
    run_backtest, BacktestConfig, Backtester, PositionState, TrailingStop,
};
use hourcross::domain::position::ExitReason;
use hourcross::domain::signal::SignalSet;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Minute bars from a multiplicative random walk starting at 100.
fn arb_bars() -> impl Strategy<Value = Vec<OhlcvBar>> {
    prop::collection::vec((-1.0..1.0_f64, 0.0..0.6_f64, 0.0..0.6_f64), 1..240).prop_map(
        |steps| {
            let mut price = 100.0;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (step, up, down))| {
                    let open = price;
                    let close = open * (1.0 + step / 100.0);
                    let high = open.max(close) * (1.0 + up / 100.0);
                    let low = open.min(close) * (1.0 - down / 100.0);
                    price = close;
                    minute_bar(i as i64, open, high, low, close)
                })
                .collect()
        },
    )
}

/// Which of the four hours covered by the bars carry a signal.
fn arb_signals() -> impl Strategy<Value = SignalSet> {
    prop::collection::vec(any::<bool>(), 4).prop_map(|flags| {
        flags
            .into_iter()
            .enumerate()
            .filter(|(_, on)| *on)
            .map(|(h, _)| t0() + Duration::hours(h as i64))
            .collect()
    })
}

fn arb_config() -> impl Strategy<Value = BacktestConfig> {
    (
        0.2..5.0_f64,
        0.2..5.0_f64,
        0.0..0.3_f64,
        0.0..0.3_f64,
        prop::option::of((0.1..3.0_f64, 0.1..3.0_f64)),
    )
        .prop_map(|(tp, sl, fee, slip, trailing)| BacktestConfig {
            initial_capital: 10_000.0,
            take_profit_pct: tp,
            stop_loss_pct: sl,
            fee_pct: fee,
            slippage_pct: slip,
            trailing: trailing.map(|(arm_pct, distance_pct)| TrailingStop {
                arm_pct,
                distance_pct,
            }),
        })
}

// ── 1. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn same_inputs_same_result(
        bars in arb_bars(),
        signals in arb_signals(),
        config in arb_config(),
    ) {
        let first = run_backtest(&bars, &signals, &config).unwrap();
        let second = run_backtest(&bars, &signals, &config).unwrap();
        prop_assert_eq!(first, second);
    }
}

// ── 2. Cash / position complement ────────────────────────────────────

proptest! {
    #[test]
    fn flat_xor_long_after_every_bar(
        bars in arb_bars(),
        signals in arb_signals(),
        config in arb_config(),
    ) {
        let mut bt = Backtester::new(&config);
        let mut closed = 0usize;

        for bar in &bars {
            if bt.step(bar, &signals).is_some() {
                closed += 1;
            }
            match bt.state() {
                PositionState::Flat { cash } => {
                    prop_assert!(*cash > 0.0);
                    prop_assert!(bt.state().position().is_none());
                }
                PositionState::Long(position) => {
                    prop_assert!(position.shares > 0.0);
                    prop_assert_eq!(bt.state().cash(), 0.0);
                }
            }
        }

        prop_assert_eq!(bt.ledger().len(), closed);
    }
}

// ── 3. Trade timing ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn entries_inside_signal_hours(
        bars in arb_bars(),
        signals in arb_signals(),
        config in arb_config(),
    ) {
        let result = run_backtest(&bars, &signals, &config).unwrap();

        let mut previous_exit = None;
        for trade in &result.ledger {
            prop_assert!(signals.contains_hour(trade.entry_time));
            prop_assert!(trade.exit_time >= trade.entry_time);
            if let Some(prev) = previous_exit {
                prop_assert!(trade.entry_time >= prev);
            }
            previous_exit = Some(trade.exit_time);
        }
        if let Some(position) = result.open_position() {
            prop_assert!(signals.contains_hour(position.entry_time));
        }
    }
}

// ── 4. Frictionless exit returns ─────────────────────────────────────

proptest! {
    #[test]
    fn frictionless_returns_match_levels(
        bars in arb_bars(),
        signals in arb_signals(),
        tp in 0.2..5.0_f64,
        sl in 0.2..5.0_f64,
    ) {
        let config = BacktestConfig {
            take_profit_pct: tp,
            stop_loss_pct: sl,
            ..frictionless_config()
        };
        let result = run_backtest(&bars, &signals, &config).unwrap();

        for trade in &result.ledger {
            match trade.reason {
                ExitReason::TakeProfit => {
                    prop_assert!(relative_eq!(trade.return_pct, tp, epsilon = 1e-9));
                }
                ExitReason::StopLoss => {
                    prop_assert!(relative_eq!(trade.return_pct, -sl, epsilon = 1e-9));
                }
                ExitReason::TrailingStop => prop_assert!(false, "trailing stop is disabled"),
            }
        }
    }
}
