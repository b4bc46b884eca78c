//! CSV/JSON result adapter implementing ReportPort.
//!
//! Writes, per strategy, the weekly series and its transactions as CSV and
//! optionally the two equity lines as JSON arrays, plus one summary CSV per
//! sweep with an optional JSON record copy. File names encode the run and strategy parameters.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::domain::error::CapweightError;
use crate::domain::metrics::{ResultSeries, SeriesEntry, StrategySummary};
use crate::domain::strategy::{RunConfig, StrategyConfig};
use crate::ports::report_port::ReportPort;

const PERC_FACTOR: f64 = 100.0;

/// `s-{start}_e-{end}_au-{capital}_f-{fee%}`, shared by every file of a sweep.
pub fn run_stem(run: &RunConfig, transaction_fee: f64) -> String {
    format!(
        "s-{}_e-{}_au-{:.0}_f-{:.2}",
        run.start_date,
        run.end_date,
        run.initial_capital,
        transaction_fee * PERC_FACTOR
    )
}

/// Run stem extended with `_rpw-{period}_cn-{basket}_wc-{cap%}`.
pub fn strategy_stem(run: &RunConfig, strategy: &StrategyConfig) -> String {
    format!(
        "{}_rpw-{}_cn-{}_wc-{:.0}",
        run_stem(run, strategy.transaction_fee),
        strategy.rebalance_period_weeks,
        strategy.basket_size,
        strategy.weight_cap * PERC_FACTOR
    )
}

#[derive(Debug, Serialize)]
struct SeriesRow {
    date: String,
    status: &'static str,
    week_index: Option<usize>,
    rebalanced: Option<bool>,
    amount_usd: Option<f64>,
    amount_btc: Option<f64>,
    transactions: Option<usize>,
    transactions_amount_usd: Option<f64>,
    transactions_amount_btc: Option<f64>,
    transaction_fees_usd: Option<f64>,
    transaction_fees_btc: Option<f64>,
    profit_usd: Option<f64>,
    profit_btc: Option<f64>,
    roi_usd: Option<f64>,
    roi_btc: Option<f64>,
    tot_transactions_number: Option<usize>,
    tot_transactions_amount_usd: Option<f64>,
    tot_transactions_amount_btc: Option<f64>,
    tot_transaction_fees_usd: Option<f64>,
    tot_transaction_fees_btc: Option<f64>,
    expanding_max_usd: Option<f64>,
    drawdown_usd: Option<f64>,
    drawdown_usd_perc: Option<f64>,
    max_drawdown_usd: Option<f64>,
    max_drawdown_usd_perc: Option<f64>,
    expanding_max_btc: Option<f64>,
    drawdown_btc: Option<f64>,
    drawdown_btc_perc: Option<f64>,
    max_drawdown_btc: Option<f64>,
    max_drawdown_btc_perc: Option<f64>,
    amount_usd_weekly_returns: Option<f64>,
    amount_btc_weekly_returns: Option<f64>,
    amount_usd_sharpe_ratio: Option<f64>,
    amount_btc_sharpe_ratio: Option<f64>,
    missing_reason: Option<String>,
}

impl SeriesRow {
    fn from_entry(entry: &SeriesEntry<'_>) -> Self {
        match entry {
            SeriesEntry::Week(week, m) => SeriesRow {
                date: week.date.to_string(),
                status: "ok",
                week_index: Some(week.week_index),
                rebalanced: Some(week.rebalanced),
                amount_usd: Some(week.equity.usd),
                amount_btc: Some(week.equity.btc),
                transactions: Some(week.transactions),
                transactions_amount_usd: Some(week.transacted.usd),
                transactions_amount_btc: Some(week.transacted.btc),
                transaction_fees_usd: Some(week.fees.usd),
                transaction_fees_btc: Some(week.fees.btc),
                profit_usd: Some(m.profit.usd),
                profit_btc: Some(m.profit.btc),
                roi_usd: Some(m.roi_pct.usd),
                roi_btc: Some(m.roi_pct.btc),
                tot_transactions_number: Some(m.total_transactions),
                tot_transactions_amount_usd: Some(m.total_transacted.usd),
                tot_transactions_amount_btc: Some(m.total_transacted.btc),
                tot_transaction_fees_usd: Some(m.total_fees.usd),
                tot_transaction_fees_btc: Some(m.total_fees.btc),
                expanding_max_usd: Some(m.usd.running_max),
                drawdown_usd: Some(m.usd.drawdown),
                drawdown_usd_perc: Some(m.usd.drawdown_pct),
                max_drawdown_usd: Some(m.usd.max_drawdown),
                max_drawdown_usd_perc: Some(m.usd.max_drawdown_pct),
                expanding_max_btc: Some(m.btc.running_max),
                drawdown_btc: Some(m.btc.drawdown),
                drawdown_btc_perc: Some(m.btc.drawdown_pct),
                max_drawdown_btc: Some(m.btc.max_drawdown),
                max_drawdown_btc_perc: Some(m.btc.max_drawdown_pct),
                amount_usd_weekly_returns: m.usd.period_return,
                amount_btc_weekly_returns: m.btc.period_return,
                amount_usd_sharpe_ratio: m.usd.sharpe_ratio,
                amount_btc_sharpe_ratio: m.btc.sharpe_ratio,
                missing_reason: None,
            },
            SeriesEntry::Missing(gap) => SeriesRow {
                date: gap.date.to_string(),
                status: "missing",
                week_index: None,
                rebalanced: None,
                amount_usd: None,
                amount_btc: None,
                transactions: None,
                transactions_amount_usd: None,
                transactions_amount_btc: None,
                transaction_fees_usd: None,
                transaction_fees_btc: None,
                profit_usd: None,
                profit_btc: None,
                roi_usd: None,
                roi_btc: None,
                tot_transactions_number: None,
                tot_transactions_amount_usd: None,
                tot_transactions_amount_btc: None,
                tot_transaction_fees_usd: None,
                tot_transaction_fees_btc: None,
                expanding_max_usd: None,
                drawdown_usd: None,
                drawdown_usd_perc: None,
                max_drawdown_usd: None,
                max_drawdown_usd_perc: None,
                expanding_max_btc: None,
                drawdown_btc: None,
                drawdown_btc_perc: None,
                max_drawdown_btc: None,
                max_drawdown_btc_perc: None,
                amount_usd_weekly_returns: None,
                amount_btc_weekly_returns: None,
                amount_usd_sharpe_ratio: None,
                amount_btc_sharpe_ratio: None,
                missing_reason: Some(gap.reason.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct TransactionRow<'a> {
    date: String,
    source_curr: &'a str,
    dest_curr: &'a str,
    size: f64,
    priceusd: f64,
    pricebtc: f64,
    amount_usd: f64,
    amount_btc: f64,
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    start_date: String,
    end_date: String,
    initial_amount_usd: f64,
    crypto_number: usize,
    weight_cap_perc: f64,
    rebalance_period_weeks: usize,
    transaction_fee_perc: f64,
    weeks: usize,
    missing_weeks: usize,
    profit_usd: f64,
    profit_btc: f64,
    roi_usd: f64,
    roi_btc: f64,
    tot_transactions_number: usize,
    tot_transactions_amount_usd: f64,
    tot_transactions_amount_btc: f64,
    tot_transaction_fees_usd: f64,
    tot_transaction_fees_btc: f64,
    max_drawdown: f64,
    max_drawdown_perc: f64,
    amount_usd_sharpe_ratio: Option<f64>,
    amount_btc_sharpe_ratio: Option<f64>,
}

impl From<&StrategySummary> for SummaryRow {
    fn from(s: &StrategySummary) -> Self {
        SummaryRow {
            start_date: s.start_date.to_string(),
            end_date: s.end_date.to_string(),
            initial_amount_usd: s.initial_capital.usd,
            crypto_number: s.strategy.basket_size,
            weight_cap_perc: s.strategy.weight_cap * PERC_FACTOR,
            rebalance_period_weeks: s.strategy.rebalance_period_weeks,
            transaction_fee_perc: s.strategy.transaction_fee * PERC_FACTOR,
            weeks: s.weeks,
            missing_weeks: s.missing_weeks,
            profit_usd: s.profit.usd,
            profit_btc: s.profit.btc,
            roi_usd: s.roi_pct.usd,
            roi_btc: s.roi_pct.btc,
            tot_transactions_number: s.total_transactions,
            tot_transactions_amount_usd: s.total_transacted.usd,
            tot_transactions_amount_btc: s.total_transacted.btc,
            tot_transaction_fees_usd: s.total_fees.usd,
            tot_transaction_fees_btc: s.total_fees.btc,
            max_drawdown: s.max_drawdown,
            max_drawdown_perc: s.max_drawdown_pct,
            amount_usd_sharpe_ratio: s.sharpe_usd,
            amount_btc_sharpe_ratio: s.sharpe_btc,
        }
    }
}

fn report_error(path: &Path, e: impl std::fmt::Display) -> CapweightError {
    CapweightError::Report {
        reason: format!("failed to write {}: {}", path.display(), e),
    }
}

pub struct FileReportAdapter {
    output_dir: PathBuf,
}

impl FileReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn prepare(&self, file_name: String) -> Result<PathBuf, CapweightError> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(self.output_dir.join(file_name))
    }

    fn write_csv<S, I>(&self, path: &Path, rows: I) -> Result<(), CapweightError>
    where
        S: Serialize,
        I: IntoIterator<Item = S>,
    {
        let mut wtr = csv::Writer::from_path(path).map_err(|e| report_error(path, e))?;
        for row in rows {
            wtr.serialize(row).map_err(|e| report_error(path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_json<T>(&self, path: &Path, value: &T) -> Result<(), CapweightError>
    where
        T: Serialize + ?Sized,
    {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, value).map_err(|e| report_error(path, e))?;
        writer.flush()?;
        Ok(())
    }
}

impl ReportPort for FileReportAdapter {
    fn write_series(
        &self,
        series: &ResultSeries,
        strategy: &StrategyConfig,
        run: &RunConfig,
    ) -> Result<PathBuf, CapweightError> {
        let path = self.prepare(format!("{}.csv", strategy_stem(run, strategy)))?;
        let entries = series.entries();
        self.write_csv(&path, entries.iter().map(SeriesRow::from_entry))?;
        info!(path = %path.display(), "series written");
        Ok(path)
    }

    fn write_transactions(
        &self,
        series: &ResultSeries,
        strategy: &StrategyConfig,
        run: &RunConfig,
    ) -> Result<PathBuf, CapweightError> {
        let path = self.prepare(format!("transactions_{}.csv", strategy_stem(run, strategy)))?;
        let rows = series.transactions().iter().map(|t| TransactionRow {
            date: t.date.to_string(),
            source_curr: &t.source,
            dest_curr: &t.destination,
            size: t.size,
            priceusd: t.price.usd,
            pricebtc: t.price.btc,
            amount_usd: t.amount.usd,
            amount_btc: t.amount.btc,
        });
        self.write_csv(&path, rows)?;
        info!(path = %path.display(), "transactions written");
        Ok(path)
    }

    fn write_equity_json(
        &self,
        series: &ResultSeries,
        strategy: &StrategyConfig,
        run: &RunConfig,
    ) -> Result<Vec<PathBuf>, CapweightError> {
        let stem = strategy_stem(run, strategy);
        let usd_path = self.prepare(format!("equity-usd_{}.json", stem))?;
        self.write_json(&usd_path, &series.equity_usd())?;
        let btc_path = self.prepare(format!("equity-btc_{}.json", stem))?;
        self.write_json(&btc_path, &series.equity_btc())?;
        info!(usd = %usd_path.display(), btc = %btc_path.display(), "equity lines written");
        Ok(vec![usd_path, btc_path])
    }

    fn write_summary(
        &self,
        summaries: &[StrategySummary],
        run: &RunConfig,
        transaction_fee: f64,
    ) -> Result<PathBuf, CapweightError> {
        let path = self.prepare(format!(
            "test_suite_results-{}.csv",
            run_stem(run, transaction_fee)
        ))?;
        self.write_csv(&path, summaries.iter().map(SummaryRow::from))?;
        info!(path = %path.display(), strategies = summaries.len(), "summary written");
        Ok(path)
    }

    fn write_summary_json(
        &self,
        summaries: &[StrategySummary],
        run: &RunConfig,
        transaction_fee: f64,
    ) -> Result<PathBuf, CapweightError> {
        let path = self.prepare(format!(
            "test_suite_results-{}.json",
            run_stem(run, transaction_fee)
        ))?;
        let rows: Vec<SummaryRow> = summaries.iter().map(SummaryRow::from).collect();
        self.write_json(&path, &rows)?;
        info!(path = %path.display(), strategies = summaries.len(), "summary records written");
        Ok(path)
    }
}
