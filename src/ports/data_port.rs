//! Market data access port trait.

use crate::domain::error::HourcrossError;
use crate::domain::ohlcv::{OhlcvBar, Timeframe};
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` at `timeframe` covering `[start - warmup, end)`.
    ///
    /// Implementations return bars sorted, deduplicated and expressed in the
    /// adapter's display offset (see [`crate::domain::feed::normalize_bars`]).
    /// An empty result is not an error here; callers decide.
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
        warmup_bars: u32,
    ) -> Result<Vec<OhlcvBar>, HourcrossError>;
}
