//! Configuration validation.
//!
//! Validates all config fields before a backtest runs. Missing numeric keys
//! fall back to the same defaults the run builder uses.

use crate::domain::backtest::{BacktestConfig, TrailingStop};
use crate::domain::error::HourcrossError;
use crate::domain::feed::MAX_WARMUP_BARS;
use crate::domain::signal::{DEFAULT_FAST_SPAN, DEFAULT_SLOW_SPAN};
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DATA_SOURCES: [&str; 2] = ["csv", "binance"];

/// `symbol_override` stands in for the configured symbol list when given.
pub fn validate_backtest_config(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<(), HourcrossError> {
    validate_initial_capital(config)?;
    validate_non_negative(config, "backtest", "fee_pct", BacktestConfig::default().fee_pct)?;
    validate_non_negative(
        config,
        "backtest",
        "slippage_pct",
        BacktestConfig::default().slippage_pct,
    )?;
    validate_dates(config)?;
    validate_symbols(config, symbol_override)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), HourcrossError> {
    let defaults = BacktestConfig::default();
    validate_non_negative(config, "strategy", "take_profit", defaults.take_profit_pct)?;
    validate_non_negative(config, "strategy", "stop_loss", defaults.stop_loss_pct)?;
    if config.get_bool("strategy", "trailing_enabled", true) {
        let trailing = TrailingStop::default();
        validate_non_negative(config, "strategy", "trailing_arm", trailing.arm_pct)?;
        validate_non_negative(config, "strategy", "trailing_distance", trailing.distance_pct)?;
    }
    validate_spans(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), HourcrossError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string())
        .to_lowercase();
    if !DATA_SOURCES.contains(&source.as_str()) {
        return Err(HourcrossError::invalid_config(
            "data",
            "source",
            format!("unknown source '{source}', expected one of {}", DATA_SOURCES.join(", ")),
        ));
    }

    if source == "csv" {
        match config.get_string("data", "data_dir") {
            Some(s) if !s.trim().is_empty() => {}
            _ => {
                return Err(HourcrossError::ConfigMissing {
                    section: "data".to_string(),
                    key: "data_dir".to_string(),
                })
            }
        }
    }

    let offset = config.get_int("data", "utc_offset_hours", 0);
    if !(-12..=14).contains(&offset) {
        return Err(HourcrossError::invalid_config(
            "data",
            "utc_offset_hours",
            "utc_offset_hours must be between -12 and 14",
        ));
    }

    for key in ["signal_warmup_bars", "execution_warmup_bars"] {
        let value = config.get_int("data", key, 0);
        if !(0..=i64::from(MAX_WARMUP_BARS)).contains(&value) {
            return Err(HourcrossError::invalid_config(
                "data",
                key,
                format!("{key} must be between 0 and {MAX_WARMUP_BARS}"),
            ));
        }
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), HourcrossError> {
    let value = config.get_double(
        "backtest",
        "initial_capital",
        BacktestConfig::default().initial_capital,
    );
    if !value.is_finite() || value <= 0.0 {
        return Err(HourcrossError::invalid_config(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), HourcrossError> {
    let value = config.get_double(section, key, default);
    if !value.is_finite() || value < 0.0 {
        return Err(HourcrossError::invalid_config(
            section,
            key,
            format!("{key} must be non-negative"),
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), HourcrossError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(HourcrossError::invalid_config(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, HourcrossError> {
    match value {
        None => Err(HourcrossError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            HourcrossError::invalid_config(
                "backtest",
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

fn validate_symbols(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<(), HourcrossError> {
    let symbols = symbol_override
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "symbols"))
        .or_else(|| config.get_string("backtest", "symbol"))
        .filter(|s| !s.trim().is_empty());

    let Some(symbols) = symbols else {
        return Err(HourcrossError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
        });
    };

    let quote = config.get_string("backtest", "quote");
    parse_symbols(&symbols, quote.as_deref())
        .map(|_| ())
        .map_err(|e| HourcrossError::invalid_config("backtest", "symbols", e.to_string()))
}

fn validate_spans(config: &dyn ConfigPort) -> Result<(), HourcrossError> {
    let fast = config.get_int("strategy", "fast_span", DEFAULT_FAST_SPAN as i64);
    let slow = config.get_int("strategy", "slow_span", DEFAULT_SLOW_SPAN as i64);

    if fast < 1 {
        return Err(HourcrossError::invalid_config(
            "strategy",
            "fast_span",
            "fast_span must be at least 1",
        ));
    }
    if slow <= fast {
        return Err(HourcrossError::invalid_config(
            "strategy",
            "slow_span",
            "slow_span must be greater than fast_span",
        ));
    }
    Ok(())
}
