//! Single-strategy backtest driver.
//!
//! Folds the simulator over the weekly calendar, feeding processed weeks into
//! the metrics aggregator and collecting gaps along the way.

use tracing::{error, info, warn};

use super::asset::Quote;
use super::calendar::weekly_dates;
use super::error::SimulationError;
use super::metrics::{MetricsAggregator, ResultSeries};
use super::simulation::{PortfolioSimulator, WeekOutcome};
use super::strategy::{RunConfig, StrategyConfig};
use crate::ports::snapshot_port::SnapshotPort;

pub fn run_backtest(
    port: &dyn SnapshotPort,
    strategy: &StrategyConfig,
    run: &RunConfig,
) -> Result<ResultSeries, SimulationError> {
    info!(%strategy, start = %run.start_date, end = %run.end_date, "starting backtest");

    let mut simulator = PortfolioSimulator::new(strategy.clone(), run);
    let mut aggregator: Option<MetricsAggregator> = None;
    let mut gaps = Vec::new();
    let mut transactions = Vec::new();

    for date in weekly_dates(run.start_date, run.end_date) {
        let fetched = port.fetch_snapshot(date, run.max_rows);
        match simulator.step(date, fetched) {
            WeekOutcome::Completed(report) => {
                // initial capital in BTC is fixed by the first processed week
                let opening = report.opening_equity;
                let agg = aggregator.get_or_insert_with(|| {
                    MetricsAggregator::new(Quote::new(run.initial_capital, opening.btc))
                });
                agg.push(report.result);
                transactions.extend(report.transactions);
            }
            WeekOutcome::Skipped(gap) => {
                warn!(%date, reason = %gap.reason, "week skipped");
                gaps.push(gap);
            }
            WeekOutcome::Failed(err) => {
                error!(%strategy, error = %err, "backtest failed");
                return Err(err);
            }
        }
    }

    let no_data = SimulationError::NoData {
        start: run.start_date,
        end: run.end_date,
    };
    let series = aggregator
        .ok_or_else(|| no_data.clone())?
        .finalize()
        .map_err(|_| no_data)?;

    info!(
        %strategy,
        weeks = series.len(),
        gaps = gaps.len(),
        equity_usd = series.last_week().equity.usd,
        "backtest finished"
    );
    Ok(series.with_gaps(gaps).with_transactions(transactions))
}
