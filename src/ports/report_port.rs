//! Result export port trait.

use std::path::PathBuf;

use crate::domain::error::CapweightError;
use crate::domain::metrics::{ResultSeries, StrategySummary};
use crate::domain::strategy::{RunConfig, StrategyConfig};

/// Port for persisting backtest results. Each method returns the written path(s).
pub trait ReportPort {
    /// One row per expected weekly date, gaps included.
    fn write_series(
        &self,
        series: &ResultSeries,
        strategy: &StrategyConfig,
        run: &RunConfig,
    ) -> Result<PathBuf, CapweightError>;

    fn write_transactions(
        &self,
        series: &ResultSeries,
        strategy: &StrategyConfig,
        run: &RunConfig,
    ) -> Result<PathBuf, CapweightError>;

    /// USD and BTC equity lines as flat JSON arrays.
    fn write_equity_json(
        &self,
        series: &ResultSeries,
        strategy: &StrategyConfig,
        run: &RunConfig,
    ) -> Result<Vec<PathBuf>, CapweightError>;

    fn write_summary(
        &self,
        summaries: &[StrategySummary],
        run: &RunConfig,
        transaction_fee: f64,
    ) -> Result<PathBuf, CapweightError>;

    /// The sweep summary as an array of JSON records.
    fn write_summary_json(
        &self,
        summaries: &[StrategySummary],
        run: &RunConfig,
        transaction_fee: f64,
    ) -> Result<PathBuf, CapweightError>;
}
