//! OHLCV bar representation and bar timeframes.

use chrono::{DateTime, Duration, FixedOffset, Timelike};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// Build a bar from an exchange open time in epoch milliseconds,
    /// expressed in `offset`. Returns `None` for out-of-range timestamps.
    pub fn from_millis(
        open_time_ms: i64,
        offset: FixedOffset,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Option<Self> {
        let timestamp = DateTime::from_timestamp_millis(open_time_ms)?.with_timezone(&offset);
        Some(OhlcvBar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Timestamp floored to the top of its hour.
    pub fn hour_bucket(&self) -> DateTime<FixedOffset> {
        floor_to_hour(self.timestamp)
    }
}

pub fn floor_to_hour(ts: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Bar resolution requested from a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    Minute1,
    Hour1,
    Day1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Hour1 => "1h",
            Timeframe::Day1 => "1d",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::Minute1 => Duration::minutes(1),
            Timeframe::Hour1 => Duration::hours(1),
            Timeframe::Day1 => Duration::days(1),
        }
    }

    /// Lookback covered by `bars` bars of this timeframe.
    pub fn warmup(&self, bars: u32) -> Duration {
        let bars = i64::from(bars);
        match self {
            Timeframe::Minute1 => Duration::minutes(bars),
            Timeframe::Hour1 => Duration::hours(bars),
            Timeframe::Day1 => Duration::days(bars),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Ok(Timeframe::Minute1),
            "1h" => Ok(Timeframe::Hour1),
            "1d" => Ok(Timeframe::Day1),
            other => Err(format!("unsupported timeframe '{other}'")),
        }
    }
}
