//! Paginated kline download shared by exchange adapters.
//!
//! Exchanges cap how many klines one request returns, so a window is fetched
//! page by page: request from the cursor, append, move the cursor one
//! millisecond past the last open time, stop on an empty page or once the
//! cursor passes the window end.

use tracing::debug;

use crate::domain::error::HourcrossError;
use crate::domain::feed::{normalize_bars, FetchWindow};
use crate::domain::ohlcv::{OhlcvBar, Timeframe};
use crate::ports::data_port::DataPort;
use chrono::{FixedOffset, NaiveDate};

pub const PAGE_LIMIT: usize = 1000;

/// One kline as exchanges send it: open time in epoch ms, prices and volume
/// as decimal strings.
#[derive(Debug, Clone, PartialEq)]
pub struct RawKline {
    pub open_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

impl RawKline {
    pub fn to_bar(&self, offset: FixedOffset) -> Result<OhlcvBar, HourcrossError> {
        let num = |name: &str, raw: &str| -> Result<f64, HourcrossError> {
            raw.trim().parse().map_err(|_| HourcrossError::Data {
                reason: format!("kline at {}: invalid {name} '{raw}'", self.open_time),
            })
        };

        OhlcvBar::from_millis(
            self.open_time,
            offset,
            num("open", &self.open)?,
            num("high", &self.high)?,
            num("low", &self.low)?,
            num("close", &self.close)?,
            num("volume", &self.volume)?,
        )
        .ok_or_else(|| HourcrossError::Data {
            reason: format!("kline open time out of range: {}", self.open_time),
        })
    }
}

/// A single page request against an exchange.
pub trait KlineSource {
    /// Up to `limit` klines with open time `>= since_ms`, oldest first.
    fn fetch_page(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<RawKline>, HourcrossError>;
}

/// Download every kline in `[window.since, window.end)` page by page.
///
/// The returned bars are not yet filtered to the window; the last page may
/// overshoot `window.end`.
pub fn fetch_paginated<S: KlineSource + ?Sized>(
    source: &S,
    symbol: &str,
    timeframe: Timeframe,
    window: &FetchWindow,
    offset: FixedOffset,
) -> Result<Vec<OhlcvBar>, HourcrossError> {
    let end_ms = window.end_ms();
    let mut cursor = window.since_ms();
    let mut bars = Vec::new();
    let mut pages = 0usize;

    while cursor < end_ms {
        let page = source.fetch_page(symbol, timeframe, cursor, PAGE_LIMIT)?;
        let Some(last) = page.last() else {
            break;
        };
        let next = last.open_time + 1;

        for kline in &page {
            bars.push(kline.to_bar(offset)?);
        }
        pages += 1;

        // A source that ignores the cursor would loop forever.
        if next <= cursor {
            break;
        }
        cursor = next;
    }

    debug!(symbol, %timeframe, pages, bars = bars.len(), "klines downloaded");
    Ok(bars)
}

/// [`DataPort`] over any [`KlineSource`].
pub struct KlineFeed<S> {
    source: S,
    offset: FixedOffset,
}

impl<S: KlineSource> KlineFeed<S> {
    pub fn new(source: S, offset: FixedOffset) -> Self {
        Self { source, offset }
    }
}

impl<S: KlineSource> DataPort for KlineFeed<S> {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
        warmup_bars: u32,
    ) -> Result<Vec<OhlcvBar>, HourcrossError> {
        let window = FetchWindow::new(timeframe, start, end, warmup_bars)?;
        let bars = fetch_paginated(&self.source, symbol, timeframe, &window, self.offset)?;
        Ok(normalize_bars(bars, &window, self.offset))
    }
}
