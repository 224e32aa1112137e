//! Binance spot REST kline source.
//!
//! Pulls `/api/v3/klines` one page at a time; pagination lives in
//! [`super::kline_feed`]. Transport failures and non-success statuses map to
//! [`HourcrossError::Data`]. No retries.

use super::kline_feed::{KlineFeed, KlineSource, RawKline};
use crate::domain::error::HourcrossError;
use crate::domain::ohlcv::Timeframe;
use crate::domain::universe::exchange_symbol;
use chrono::FixedOffset;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Error body Binance returns alongside 4xx statuses.
#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

pub struct BinanceSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl BinanceSource {
    pub fn new() -> Result<Self, HourcrossError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, HourcrossError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HourcrossError::Data {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn into_feed(self, offset: FixedOffset) -> KlineFeed<Self> {
        KlineFeed::new(self, offset)
    }
}

impl KlineSource for BinanceSource {
    fn fetch_page(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<RawKline>, HourcrossError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", exchange_symbol(symbol)),
                ("interval", timeframe.as_str().to_string()),
                ("startTime", since_ms.to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .map_err(|e| HourcrossError::Data {
                reason: format!("request for {symbol} {timeframe} failed: {e}"),
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| HourcrossError::Data {
            reason: format!("reading response for {symbol} failed: {e}"),
        })?;

        if !status.is_success() {
            let reason = match serde_json::from_str::<ApiError>(&body) {
                Ok(err) => format!("HTTP {status} for {symbol}: {} ({})", err.msg, err.code),
                Err(_) => format!("HTTP {status} for {symbol}"),
            };
            return Err(HourcrossError::Data { reason });
        }

        parse_klines(&body)
    }
}

/// Parse the `[[open_time, "o", "h", "l", "c", "v", ...], ...]` body.
pub fn parse_klines(body: &str) -> Result<Vec<RawKline>, HourcrossError> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body).map_err(|e| HourcrossError::Data {
        reason: format!("unexpected kline payload: {e}"),
    })?;

    rows.iter().map(|row| parse_row(row)).collect()
}

fn parse_row(row: &[Value]) -> Result<RawKline, HourcrossError> {
    let malformed = || HourcrossError::Data {
        reason: format!("malformed kline row: {}", Value::from(row.to_vec())),
    };

    let open_time = row.first().and_then(Value::as_i64).ok_or_else(malformed)?;
    let field = |i: usize| -> Result<String, HourcrossError> {
        match row.get(i) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(malformed()),
        }
    };

    Ok(RawKline {
        open_time,
        open: field(1)?,
        high: field(2)?,
        low: field(3)?,
        close: field(4)?,
        volume: field(5)?,
    })
}
