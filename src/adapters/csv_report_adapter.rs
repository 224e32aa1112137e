//! CSV trade table report.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::HourcrossError;
use crate::ports::report_port::ReportPort;
use std::fs::File;
use std::path::Path;

pub const HEADER: [&str; 7] = [
    "symbol",
    "entry",
    "exit",
    "return_pct",
    "reason",
    "entry_price",
    "exit_price",
];

/// Writes one row per closed trade, in ledger order.
#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn csv_err(e: csv::Error) -> HourcrossError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => HourcrossError::Io(io),
        other => HourcrossError::Data {
            reason: format!("CSV write error: {other:?}"),
        },
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        symbol: &str,
        result: &BacktestResult,
        output_path: &str,
    ) -> Result<(), HourcrossError> {
        let path = Path::new(output_path);
        let file = File::create(path)?;
        let mut wtr = csv::Writer::from_writer(file);

        wtr.write_record(HEADER).map_err(csv_err)?;
        for trade in &result.ledger {
            wtr.write_record([
                symbol.to_string(),
                trade.entry_time.to_rfc3339(),
                trade.exit_time.to_rfc3339(),
                format!("{:.4}", trade.return_pct),
                trade.reason.to_string(),
                format!("{:.8}", trade.entry_price),
                format!("{:.8}", trade.exit_price),
            ])
            .map_err(csv_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
