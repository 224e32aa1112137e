//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::HourcrossError;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(
        &self,
        symbol: &str,
        result: &BacktestResult,
        output_path: &str,
    ) -> Result<(), HourcrossError>;
}
