//! Bar feed preparation: fetch windows, normalization and validation.
//!
//! Adapters hand raw bars to [`normalize_bars`]; the backtest entry point
//! checks its input with [`validate_bars`] before the fold starts.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

use super::error::HourcrossError;
use super::ohlcv::{OhlcvBar, Timeframe};

/// Hourly bars fetched ahead of the start date to settle the EMAs.
pub const DEFAULT_SIGNAL_WARMUP_BARS: u32 = 100;
/// Minute bars fetched ahead of the start date.
pub const DEFAULT_EXECUTION_WARMUP_BARS: u32 = 200;
/// Largest warm-up accepted from configuration.
pub const MAX_WARMUP_BARS: u32 = i32::MAX as u32;
/// Offset every bar timestamp is expressed in.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 2;

/// Half-open time range `[since, end)` requested from a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub since: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    /// Window from `start - warmup` to `end`, both dates taken at UTC midnight.
    ///
    /// Fails when the warm-up reaches past the earliest representable instant.
    pub fn new(
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
        warmup_bars: u32,
    ) -> Result<Self, HourcrossError> {
        let start = start.and_time(NaiveTime::default()).and_utc();
        let end = end.and_time(NaiveTime::default()).and_utc();
        let since = start
            .checked_sub_signed(timeframe.warmup(warmup_bars))
            .ok_or_else(|| HourcrossError::InvalidParameter {
                reason: format!("warm-up of {warmup_bars} {timeframe} bars is out of range"),
            })?;
        Ok(FetchWindow { since, end })
    }

    pub fn since_ms(&self) -> i64 {
        self.since.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }

    pub fn contains(&self, ts: &DateTime<FixedOffset>) -> bool {
        *ts >= self.since && *ts < self.end
    }
}

/// Restrict bars to `window`, sort them, drop duplicate timestamps (first
/// occurrence wins) and express every timestamp in `offset`.
pub fn normalize_bars(
    bars: Vec<OhlcvBar>,
    window: &FetchWindow,
    offset: FixedOffset,
) -> Vec<OhlcvBar> {
    let mut bars: Vec<OhlcvBar> = bars
        .into_iter()
        .filter(|b| window.contains(&b.timestamp))
        .map(|mut b| {
            b.timestamp = b.timestamp.with_timezone(&offset);
            b
        })
        .collect();

    // Stable sort keeps the first occurrence ahead of later duplicates.
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by(|later, earlier| later.timestamp == earlier.timestamp);
    bars
}

/// Reject feeds the state machine is not defined for: timestamps must be
/// strictly increasing and every price finite and positive.
pub fn validate_bars(bars: &[OhlcvBar]) -> Result<(), HourcrossError> {
    for (index, bar) in bars.iter().enumerate() {
        let prices = [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
        ];
        for (name, value) in prices {
            if !value.is_finite() || value <= 0.0 {
                return Err(HourcrossError::InvalidInput {
                    index,
                    reason: format!("{name} must be a positive number, got {value}"),
                });
            }
        }

        if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
            return Err(HourcrossError::InvalidInput {
                index,
                reason: format!(
                    "timestamp {} is not after previous bar {}",
                    bar.timestamp,
                    bars[index - 1].timestamp
                ),
            });
        }
    }
    Ok(())
}
