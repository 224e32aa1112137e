//! Entry signals: hour buckets in which a long entry is armed.
//!
//! Signals come from an upward EMA crossover on hourly bars: bar `i` fires
//! when `fast[i] > slow[i]` and `fast[i-1] <= slow[i-1]`.

use chrono::{DateTime, FixedOffset};
use std::collections::BTreeSet;

use super::ema::calculate_ema;
use super::ohlcv::{floor_to_hour, OhlcvBar};

pub const DEFAULT_FAST_SPAN: usize = 6;
pub const DEFAULT_SLOW_SPAN: usize = 40;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSet {
    hours: BTreeSet<DateTime<FixedOffset>>,
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the hour bucket containing `ts`.
    pub fn insert(&mut self, ts: DateTime<FixedOffset>) -> bool {
        self.hours.insert(floor_to_hour(ts))
    }

    /// Does the hour containing `ts` carry a signal?
    pub fn contains_hour(&self, ts: DateTime<FixedOffset>) -> bool {
        self.hours.contains(&floor_to_hour(ts))
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DateTime<FixedOffset>> {
        self.hours.iter()
    }
}

impl FromIterator<DateTime<FixedOffset>> for SignalSet {
    fn from_iter<I: IntoIterator<Item = DateTime<FixedOffset>>>(iter: I) -> Self {
        let mut set = SignalSet::new();
        for ts in iter {
            set.insert(ts);
        }
        set
    }
}

/// Hours where the fast EMA of closes crosses strictly above the slow EMA.
pub fn compute_signals(hourly_bars: &[OhlcvBar], fast_span: usize, slow_span: usize) -> SignalSet {
    if hourly_bars.len() < 2 {
        return SignalSet::new();
    }

    let closes: Vec<f64> = hourly_bars.iter().map(|b| b.close).collect();
    let fast = calculate_ema(&closes, fast_span);
    let slow = calculate_ema(&closes, slow_span);
    if fast.len() != closes.len() || slow.len() != closes.len() {
        return SignalSet::new();
    }

    (1..hourly_bars.len())
        .filter(|&i| fast[i] > slow[i] && fast[i - 1] <= slow[i - 1])
        .map(|i| hourly_bars[i].timestamp)
        .collect()
}
