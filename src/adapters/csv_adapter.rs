//! CSV file data adapter.
//!
//! One file per symbol and timeframe: `<base>/<BASE-QUOTE>_<tf>.csv` with
//! columns `timestamp,open,high,low,close,volume`. The timestamp is the bar
//! open time in epoch milliseconds or RFC 3339.

use crate::domain::error::HourcrossError;
use crate::domain::feed::{normalize_bars, FetchWindow};
use crate::domain::ohlcv::{OhlcvBar, Timeframe};
use crate::domain::universe::symbol_file_stem;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, FixedOffset, NaiveDate};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
    offset: FixedOffset,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf, offset: FixedOffset) -> Self {
        Self { base_path, offset }
    }

    pub fn csv_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol_file_stem(symbol), timeframe))
    }
}

fn data_err(reason: String) -> HourcrossError {
    HourcrossError::Data { reason }
}

fn parse_timestamp(raw: &str, offset: FixedOffset) -> Result<DateTime<FixedOffset>, HourcrossError> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms)
            .map(|ts| ts.with_timezone(&offset))
            .ok_or_else(|| data_err(format!("timestamp out of range: {ms}")));
    }
    DateTime::parse_from_rfc3339(raw)
        .map_err(|e| data_err(format!("invalid timestamp '{raw}': {e}")))
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, HourcrossError> {
    record
        .get(index)
        .ok_or_else(|| data_err(format!("missing {name} column")))?
        .trim()
        .parse()
        .map_err(|e| data_err(format!("invalid {name} value: {e}")))
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
        warmup_bars: u32,
    ) -> Result<Vec<OhlcvBar>, HourcrossError> {
        let path = self.csv_path(symbol, timeframe);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_err(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_err(format!("CSV parse error: {e}")))?;

            let ts_str = record
                .get(0)
                .ok_or_else(|| data_err("missing timestamp column".into()))?;

            bars.push(OhlcvBar {
                timestamp: parse_timestamp(ts_str, self.offset)?,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_field(&record, 5, "volume")?,
            });
        }

        let window = FetchWindow::new(timeframe, start, end, warmup_bars)?;
        Ok(normalize_bars(bars, &window, self.offset))
    }
}
