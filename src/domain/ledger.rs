//! Trade ledger and summary statistics.

use super::position::{ExitReason, Trade};

/// Completed trades in the order they closed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeLedger {
    trades: Vec<Trade>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSummary {
    pub total_trades: usize,
    pub wins: usize,
    pub win_rate: f64,
    /// `capital + capital * sum(return_pct) / 100`.
    pub final_equity: f64,
    pub total_return_pct: f64,
    pub take_profit_exits: usize,
    pub trailing_stop_exits: usize,
    pub stop_loss_exits: usize,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trade> {
        self.trades.iter()
    }

    pub fn count_by_reason(&self, reason: ExitReason) -> usize {
        self.trades.iter().filter(|t| t.reason == reason).count()
    }

    /// Summary against `capital`, or `None` when no trade closed.
    ///
    /// Returns are summed as percentages of the initial capital rather than
    /// compounded trade over trade.
    pub fn summary(&self, capital: f64) -> Option<LedgerSummary> {
        if self.trades.is_empty() {
            return None;
        }

        let total_trades = self.trades.len();
        let wins = self.trades.iter().filter(|t| t.is_win()).count();
        let return_sum: f64 = self.trades.iter().map(|t| t.return_pct).sum();
        let final_equity = capital + capital * return_sum / 100.0;

        Some(LedgerSummary {
            total_trades,
            wins,
            win_rate: wins as f64 / total_trades as f64,
            final_equity,
            total_return_pct: (final_equity / capital - 1.0) * 100.0,
            take_profit_exits: self.count_by_reason(ExitReason::TakeProfit),
            trailing_stop_exits: self.count_by_reason(ExitReason::TrailingStop),
            stop_loss_exits: self.count_by_reason(ExitReason::StopLoss),
        })
    }
}

impl<'a> IntoIterator for &'a TradeLedger {
    type Item = &'a Trade;
    type IntoIter = std::slice::Iter<'a, Trade>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
