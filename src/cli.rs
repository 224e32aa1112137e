//! CLI definition and dispatch.

use chrono::{FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult, TrailingStop};
use crate::domain::config_validation::{
    parse_date, validate_backtest_config, validate_data_config, validate_strategy_config,
};
use crate::domain::error::HourcrossError;
use crate::domain::feed::{
    DEFAULT_EXECUTION_WARMUP_BARS, DEFAULT_SIGNAL_WARMUP_BARS, DEFAULT_UTC_OFFSET_HOURS,
    MAX_WARMUP_BARS,
};
use crate::domain::ohlcv::Timeframe;
use crate::domain::signal::{compute_signals, SignalSet, DEFAULT_FAST_SPAN, DEFAULT_SLOW_SPAN};
use crate::domain::universe::{parse_symbols, symbol_file_stem};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "hourcross",
    about = "Hourly EMA crossover backtester on minute bars"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Run a single symbol instead of the configured list
        #[arg(long)]
        symbol: Option<String>,
        /// Write the trade table as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// List the hours carrying an entry signal
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, symbol.as_deref())
            } else {
                run_backtest_command(&config, symbol.as_deref(), output.as_deref())
            }
        }
        Command::Signals { config, symbol } => run_signals(&config, symbol.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

fn report_error(err: &HourcrossError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path).map_err(|e| report_error(&e))
}

pub fn validate_config(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<(), HourcrossError> {
    validate_backtest_config(config, symbol_override)?;
    validate_strategy_config(config)?;
    validate_data_config(config)
}

/// Date range, signal spans and warmups of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub fast_span: usize,
    pub slow_span: usize,
    pub signal_warmup_bars: u32,
    pub execution_warmup_bars: u32,
}

pub fn build_run_settings(adapter: &dyn ConfigPort) -> Result<RunSettings, HourcrossError> {
    let start_date = parse_date(
        adapter.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        adapter.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;

    let span = |key: &str, default: usize| -> Result<usize, HourcrossError> {
        let value = adapter.get_int("strategy", key, default as i64);
        usize::try_from(value)
            .ok()
            .filter(|v| *v >= 1)
            .ok_or_else(|| {
                HourcrossError::invalid_config("strategy", key, format!("{key} must be at least 1"))
            })
    };
    let warmup = |key: &str, default: u32| -> Result<u32, HourcrossError> {
        let value = adapter.get_int("data", key, i64::from(default));
        u32::try_from(value)
            .ok()
            .filter(|v| *v <= MAX_WARMUP_BARS)
            .ok_or_else(|| {
                HourcrossError::invalid_config(
                    "data",
                    key,
                    format!("{key} must be between 0 and {MAX_WARMUP_BARS}"),
                )
            })
    };

    Ok(RunSettings {
        start_date,
        end_date,
        fast_span: span("fast_span", DEFAULT_FAST_SPAN)?,
        slow_span: span("slow_span", DEFAULT_SLOW_SPAN)?,
        signal_warmup_bars: warmup("signal_warmup_bars", DEFAULT_SIGNAL_WARMUP_BARS)?,
        execution_warmup_bars: warmup("execution_warmup_bars", DEFAULT_EXECUTION_WARMUP_BARS)?,
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> BacktestConfig {
    let defaults = BacktestConfig::default();
    let trailing = if adapter.get_bool("strategy", "trailing_enabled", true) {
        let d = TrailingStop::default();
        Some(TrailingStop {
            arm_pct: adapter.get_double("strategy", "trailing_arm", d.arm_pct),
            distance_pct: adapter.get_double("strategy", "trailing_distance", d.distance_pct),
        })
    } else {
        None
    };

    BacktestConfig {
        initial_capital: adapter.get_double("backtest", "initial_capital", defaults.initial_capital),
        take_profit_pct: adapter.get_double("strategy", "take_profit", defaults.take_profit_pct),
        stop_loss_pct: adapter.get_double("strategy", "stop_loss", defaults.stop_loss_pct),
        fee_pct: adapter.get_double("backtest", "fee_pct", defaults.fee_pct),
        slippage_pct: adapter.get_double("backtest", "slippage_pct", defaults.slippage_pct),
        trailing,
    }
}

pub fn utc_offset(adapter: &dyn ConfigPort) -> Result<FixedOffset, HourcrossError> {
    let hours = adapter.get_int("data", "utc_offset_hours", DEFAULT_UTC_OFFSET_HOURS as i64);
    i32::try_from(hours)
        .ok()
        .and_then(|h| h.checked_mul(3600))
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            HourcrossError::invalid_config("data", "utc_offset_hours", format!("invalid offset {hours}"))
        })
}

pub fn build_data_port(
    adapter: &dyn ConfigPort,
) -> Result<Box<dyn DataPort + Send + Sync>, HourcrossError> {
    let offset = utc_offset(adapter)?;
    let source = adapter
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string())
        .to_lowercase();

    match source.as_str() {
        "csv" => {
            let dir = adapter
                .get_string("data", "data_dir")
                .ok_or_else(|| HourcrossError::ConfigMissing {
                    section: "data".into(),
                    key: "data_dir".into(),
                })?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir), offset)))
        }
        "binance" => binance_port(offset),
        other => Err(HourcrossError::invalid_config(
            "data",
            "source",
            format!("unknown source '{other}'"),
        )),
    }
}

#[cfg(feature = "binance")]
fn binance_port(offset: FixedOffset) -> Result<Box<dyn DataPort + Send + Sync>, HourcrossError> {
    use crate::adapters::binance_adapter::BinanceSource;
    Ok(Box::new(BinanceSource::new()?.into_feed(offset)))
}

#[cfg(not(feature = "binance"))]
fn binance_port(_offset: FixedOffset) -> Result<Box<dyn DataPort + Send + Sync>, HourcrossError> {
    Err(HourcrossError::invalid_config(
        "data",
        "source",
        "binance source requires building with the `binance` feature",
    ))
}

pub fn resolve_symbols(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, HourcrossError> {
    let raw = match symbol_override {
        Some(s) => s.to_string(),
        None => config
            .get_string("backtest", "symbols")
            .or_else(|| config.get_string("backtest", "symbol"))
            .ok_or_else(|| HourcrossError::ConfigMissing {
                section: "backtest".into(),
                key: "symbol".into(),
            })?,
    };
    let quote = config.get_string("backtest", "quote");
    parse_symbols(&raw, quote.as_deref())
        .map_err(|e| HourcrossError::invalid_config("backtest", "symbols", e.to_string()))
}

/// Everything the backtest stage needs, read from one config file.
struct Prepared {
    settings: RunSettings,
    config: BacktestConfig,
    symbols: Vec<String>,
    data_port: Box<dyn DataPort + Send + Sync>,
}

fn prepare(config_path: &Path, symbol_override: Option<&str>) -> Result<Prepared, ExitCode> {
    // Stage 1: Load config
    let adapter = load_config(config_path)?;

    // Stage 2: Validate
    validate_config(&adapter, symbol_override).map_err(|e| report_error(&e))?;

    // Stage 3: Build run parameters
    let settings = build_run_settings(&adapter).map_err(|e| report_error(&e))?;
    let config = build_backtest_config(&adapter);
    let symbols = resolve_symbols(symbol_override, &adapter).map_err(|e| report_error(&e))?;

    // Stage 4: Data source
    let data_port = build_data_port(&adapter).map_err(|e| report_error(&e))?;

    Ok(Prepared {
        settings,
        config,
        symbols,
        data_port,
    })
}

fn run_backtest_command(
    config_path: &Path,
    symbol_override: Option<&str>,
    output_path: Option<&Path>,
) -> ExitCode {
    let prepared = match prepare(config_path, symbol_override) {
        Ok(p) => p,
        Err(code) => return code,
    };

    run_backtest_pipeline(
        prepared.data_port.as_ref(),
        &prepared.settings,
        &prepared.config,
        &prepared.symbols,
        output_path,
    )
}

/// Outcome of one symbol's run.
#[derive(Debug, Clone)]
pub struct SymbolReport {
    pub symbol: String,
    pub signal_count: usize,
    pub result: BacktestResult,
    /// Close of the last minute bar, used to value a position left open.
    pub last_close: Option<f64>,
}

pub fn fetch_signals(
    data_port: &dyn DataPort,
    symbol: &str,
    settings: &RunSettings,
) -> Result<SignalSet, HourcrossError> {
    let hourly = data_port.fetch_bars(
        symbol,
        Timeframe::Hour1,
        settings.start_date,
        settings.end_date,
        settings.signal_warmup_bars,
    )?;
    if hourly.is_empty() {
        return Err(HourcrossError::NoData {
            symbol: symbol.to_string(),
            timeframe: Timeframe::Hour1.to_string(),
        });
    }
    info!(symbol, bars = hourly.len(), "hourly bars loaded");
    Ok(compute_signals(&hourly, settings.fast_span, settings.slow_span))
}

pub fn backtest_symbol(
    data_port: &dyn DataPort,
    symbol: &str,
    settings: &RunSettings,
    config: &BacktestConfig,
) -> Result<SymbolReport, HourcrossError> {
    let signals = fetch_signals(data_port, symbol, settings)?;

    let minutes = data_port.fetch_bars(
        symbol,
        Timeframe::Minute1,
        settings.start_date,
        settings.end_date,
        settings.execution_warmup_bars,
    )?;
    if minutes.is_empty() {
        return Err(HourcrossError::NoData {
            symbol: symbol.to_string(),
            timeframe: Timeframe::Minute1.to_string(),
        });
    }

    info!(
        symbol,
        bars = minutes.len(),
        signals = signals.len(),
        "running backtest"
    );
    let result = run_backtest(&minutes, &signals, config)?;

    Ok(SymbolReport {
        symbol: symbol.to_string(),
        signal_count: signals.len(),
        last_close: minutes.last().map(|b| b.close),
        result,
    })
}

/// Run every symbol independently, in parallel. Results keep `symbols` order.
pub fn run_symbols(
    data_port: &(dyn DataPort + Sync),
    settings: &RunSettings,
    config: &BacktestConfig,
    symbols: &[String],
) -> Vec<(String, Result<SymbolReport, HourcrossError>)> {
    symbols
        .par_iter()
        .map(|symbol| {
            (
                symbol.clone(),
                backtest_symbol(data_port, symbol, settings, config),
            )
        })
        .collect()
}

/// Trade table path for `symbol`; with several symbols each gets its own
/// file, suffixed with the symbol's file stem.
pub fn report_path(output: &Path, symbol: &str, multi: bool) -> PathBuf {
    if !multi {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trades".to_string());
    let name = match output.extension() {
        Some(ext) => format!("{stem}_{}.{}", symbol_file_stem(symbol), ext.to_string_lossy()),
        None => format!("{stem}_{}", symbol_file_stem(symbol)),
    };
    output.with_file_name(name)
}

pub fn run_backtest_pipeline(
    data_port: &(dyn DataPort + Sync),
    settings: &RunSettings,
    config: &BacktestConfig,
    symbols: &[String],
    output_path: Option<&Path>,
) -> ExitCode {
    if symbols.is_empty() {
        eprintln!("error: no symbols configured");
        return ExitCode::from(2);
    }

    // Stage 5: Fetch, signal and simulate each symbol
    eprintln!(
        "Running backtest: {} symbol(s), {} to {}",
        symbols.len(),
        settings.start_date,
        settings.end_date,
    );
    let outcomes = run_symbols(data_port, settings, config, symbols);

    // Stage 6: Summaries and reports, in configured order
    let reporter = CsvReportAdapter::new();
    let multi = symbols.len() > 1;
    let mut first_error: Option<HourcrossError> = None;
    let mut succeeded = 0usize;

    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(report) => {
                print_summary(&report, config);
                if let Some(output) = output_path {
                    let path = report_path(output, &symbol, multi);
                    if let Err(e) =
                        reporter.write(&symbol, &report.result, &path.to_string_lossy())
                    {
                        return report_error(&e);
                    }
                    eprintln!("Trades written to: {}", path.display());
                }
                succeeded += 1;
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping symbol");
                eprintln!("warning: skipping {} ({})", symbol, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if succeeded == 0 => report_error(&e),
        _ => ExitCode::SUCCESS,
    }
}

pub fn format_summary(report: &SymbolReport, config: &BacktestConfig) -> Vec<String> {
    let mut lines = vec![
        format!("=== {} ===", report.symbol),
        format!("Signals:          {}", report.signal_count),
    ];

    match report.result.ledger.summary(config.initial_capital) {
        Some(s) => {
            lines.push(format!("Return:           {:.2}%", s.total_return_pct));
            lines.push(format!("Win Rate:         {:.1}%", s.win_rate * 100.0));
            lines.push(format!(
                "Trades:           {} (TP {}, TSL {}, SL {})",
                s.total_trades, s.take_profit_exits, s.trailing_stop_exits, s.stop_loss_exits
            ));
            lines.push(format!("Final Equity:     {:.2}", s.final_equity));
        }
        None => lines.push("No trades".to_string()),
    }

    if let (Some(position), Some(close)) = (report.result.open_position(), report.last_close) {
        lines.push(format!(
            "Open position:    entered {} at {:.6}, {:+.2}% at last close (value {:.2})",
            position.entry_time,
            position.entry_price,
            position.unrealized_return_pct(close),
            position.market_value(close),
        ));
    }
    lines
}

fn print_summary(report: &SymbolReport, config: &BacktestConfig) {
    eprintln!();
    for line in format_summary(report, config) {
        eprintln!("{line}");
    }
}

pub fn run_dry_run(config_path: &Path, symbol_override: Option<&str>) -> ExitCode {
    let prepared = match prepare(config_path, symbol_override) {
        Ok(p) => p,
        Err(code) => return code,
    };
    eprintln!("Config validated successfully");

    let s = &prepared.settings;
    let c = &prepared.config;
    eprintln!("\nWindow:");
    eprintln!("  {} to {} (end exclusive)", s.start_date, s.end_date);
    eprintln!(
        "  warmup: {} hourly bars, {} minute bars",
        s.signal_warmup_bars, s.execution_warmup_bars
    );

    eprintln!("\nStrategy:");
    eprintln!("  signal: EMA({}) crosses above EMA({}) on 1h closes", s.fast_span, s.slow_span);
    eprintln!("  take profit: {}%", c.take_profit_pct);
    eprintln!("  stop loss:   {}%", c.stop_loss_pct);
    match &c.trailing {
        Some(t) => eprintln!(
            "  trailing:    arm at +{}%, distance {}%",
            t.arm_pct, t.distance_pct
        ),
        None => eprintln!("  trailing:    off"),
    }

    eprintln!("\nExecution:");
    eprintln!("  capital:  {}", c.initial_capital);
    eprintln!("  fee:      {}% per side", c.fee_pct);
    eprintln!("  slippage: {}% per side", c.slippage_pct);

    eprintln!("\nSymbols:");
    eprintln!("  {}", prepared.symbols.join(", "));

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_signals(config_path: &Path, symbol_override: Option<&str>) -> ExitCode {
    let prepared = match prepare(config_path, symbol_override) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let mut first_error: Option<HourcrossError> = None;
    let mut succeeded = 0usize;

    for symbol in &prepared.symbols {
        match fetch_signals(prepared.data_port.as_ref(), symbol, &prepared.settings) {
            Ok(signals) => {
                for hour in signals.iter() {
                    println!("{}\t{}", symbol, hour.to_rfc3339());
                }
                eprintln!("{}: {} signals", symbol, signals.len());
                succeeded += 1;
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping symbol");
                eprintln!("warning: skipping {} ({})", symbol, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if succeeded == 0 => report_error(&e),
        _ => ExitCode::SUCCESS,
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter, None) {
        return report_error(&e);
    }
    match resolve_symbols(None, &adapter) {
        Ok(symbols) => eprintln!("  symbols: {}", symbols.join(", ")),
        Err(e) => return report_error(&e),
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
