//! Running performance statistics over the weekly result series.
//!
//! Every statistic is computed online: row `k` only depends on weeks
//! `0..=k`. Drawdown and Sharpe are tracked separately for USD and BTC.

use chrono::NaiveDate;

use super::asset::Quote;
use super::simulation::{Gap, Transaction, WeekResult};
use super::strategy::StrategyConfig;

/// Weekly returns, annualized with √52.
pub const PERIODS_PER_YEAR: f64 = 52.0;

const PERC_FACTOR: f64 = 100.0;

/// Drawdown and return statistics of one equity line at one week.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskStats {
    pub running_max: f64,
    pub drawdown: f64,
    pub drawdown_pct: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub period_return: Option<f64>,
    pub sharpe_ratio: Option<f64>,
}

/// Cumulative and running metrics derived for one week.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRow {
    pub profit: Quote,
    pub roi_pct: Quote,
    pub total_transactions: usize,
    pub total_transacted: Quote,
    pub total_fees: Quote,
    pub usd: RiskStats,
    pub btc: RiskStats,
}

/// Expanding-window drawdown and Sharpe tracker for a single equity line.
///
/// Mean and variance of the period returns use Welford's update so each
/// week costs O(1).
#[derive(Debug, Clone, Default)]
struct EquityTracker {
    running_max: f64,
    max_drawdown: f64,
    max_drawdown_pct: f64,
    previous: Option<f64>,
    count: usize,
    mean: f64,
    m2: f64,
}

impl EquityTracker {
    fn update(&mut self, equity: f64) -> RiskStats {
        self.running_max = match self.previous {
            None => equity,
            Some(_) => self.running_max.max(equity),
        };
        let drawdown = equity - self.running_max;
        let drawdown_pct = if self.running_max > 0.0 {
            drawdown / self.running_max * PERC_FACTOR
        } else {
            0.0
        };
        self.max_drawdown = self.max_drawdown.min(drawdown);
        self.max_drawdown_pct = self.max_drawdown_pct.min(drawdown_pct);

        let period_return = match self.previous {
            Some(prev) if prev != 0.0 => Some((equity - prev) / prev),
            _ => None,
        };
        if let Some(r) = period_return {
            self.count += 1;
            let delta = r - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (r - self.mean);
        }
        self.previous = Some(equity);

        RiskStats {
            running_max: self.running_max,
            drawdown,
            drawdown_pct,
            max_drawdown: self.max_drawdown,
            max_drawdown_pct: self.max_drawdown_pct,
            period_return,
            sharpe_ratio: self.sharpe_ratio(),
        }
    }

    /// √52 · mean / sample stddev of the returns so far.
    fn sharpe_ratio(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        let stddev = (self.m2 / (self.count - 1) as f64).sqrt();
        if stddev > 0.0 && stddev.is_finite() {
            Some(PERIODS_PER_YEAR.sqrt() * self.mean / stddev)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot finalize a result series without any processed week")]
pub struct EmptySeriesError;

/// Folds week results into running metrics.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    initial_capital: Quote,
    weeks: Vec<WeekResult>,
    rows: Vec<MetricsRow>,
    total_transactions: usize,
    total_transacted: Quote,
    total_fees: Quote,
    usd: EquityTracker,
    btc: EquityTracker,
}

impl MetricsAggregator {
    /// `initial_capital` is the starting capital in both currencies, the
    /// BTC side converted at the first week's base price.
    pub fn new(initial_capital: Quote) -> Self {
        MetricsAggregator {
            initial_capital,
            weeks: Vec::new(),
            rows: Vec::new(),
            total_transactions: 0,
            total_transacted: Quote::ZERO,
            total_fees: Quote::ZERO,
            usd: EquityTracker::default(),
            btc: EquityTracker::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn push(&mut self, week: WeekResult) -> &MetricsRow {
        self.total_transactions += week.transactions;
        self.total_transacted += week.transacted;
        self.total_fees += week.fees;

        let profit = week.equity - self.initial_capital;
        let roi_pct = Quote::new(
            ratio_pct(profit.usd, self.initial_capital.usd),
            ratio_pct(profit.btc, self.initial_capital.btc),
        );

        let row = MetricsRow {
            profit,
            roi_pct,
            total_transactions: self.total_transactions,
            total_transacted: self.total_transacted,
            total_fees: self.total_fees,
            usd: self.usd.update(week.equity.usd),
            btc: self.btc.update(week.equity.btc),
        };
        self.weeks.push(week);
        self.rows.push(row);
        &self.rows[self.rows.len() - 1]
    }

    /// Ends the computation. Consumes the aggregator so it runs once.
    pub fn finalize(self) -> Result<ResultSeries, EmptySeriesError> {
        if self.weeks.is_empty() {
            return Err(EmptySeriesError);
        }
        Ok(ResultSeries {
            initial_capital: self.initial_capital,
            weeks: self.weeks,
            metrics: self.rows,
            gaps: Vec::new(),
            transactions: Vec::new(),
        })
    }
}

fn ratio_pct(value: f64, base: f64) -> f64 {
    if base != 0.0 {
        value / base * PERC_FACTOR
    } else {
        0.0
    }
}

/// One expected weekly date of a finished series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesEntry<'a> {
    Week(&'a WeekResult, &'a MetricsRow),
    Missing(&'a Gap),
}

impl SeriesEntry<'_> {
    pub fn date(&self) -> NaiveDate {
        match self {
            SeriesEntry::Week(week, _) => week.date,
            SeriesEntry::Missing(gap) => gap.date,
        }
    }
}

/// Finalized output of one simulation run. Always holds at least one week.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSeries {
    initial_capital: Quote,
    weeks: Vec<WeekResult>,
    metrics: Vec<MetricsRow>,
    gaps: Vec<Gap>,
    transactions: Vec<Transaction>,
}

impl ResultSeries {
    pub fn with_gaps(mut self, gaps: Vec<Gap>) -> Self {
        self.gaps = gaps;
        self
    }

    pub fn with_transactions(mut self, transactions: Vec<Transaction>) -> Self {
        self.transactions = transactions;
        self
    }

    pub fn initial_capital(&self) -> Quote {
        self.initial_capital
    }

    pub fn weeks(&self) -> &[WeekResult] {
        &self.weeks
    }

    pub fn metrics(&self) -> &[MetricsRow] {
        &self.metrics
    }

    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.weeks[0].date
    }

    pub fn last_week(&self) -> &WeekResult {
        &self.weeks[self.weeks.len() - 1]
    }

    pub fn last_metrics(&self) -> &MetricsRow {
        &self.metrics[self.metrics.len() - 1]
    }

    pub fn equity_usd(&self) -> Vec<f64> {
        self.weeks.iter().map(|w| w.equity.usd).collect()
    }

    pub fn equity_btc(&self) -> Vec<f64> {
        self.weeks.iter().map(|w| w.equity.btc).collect()
    }

    /// Processed weeks and gaps merged in date order.
    pub fn entries(&self) -> Vec<SeriesEntry<'_>> {
        let mut entries: Vec<SeriesEntry<'_>> = self
            .weeks
            .iter()
            .zip(&self.metrics)
            .map(|(w, m)| SeriesEntry::Week(w, m))
            .chain(self.gaps.iter().map(SeriesEntry::Missing))
            .collect();
        entries.sort_by_key(|e| e.date());
        entries
    }

    pub fn summary(&self, strategy: &StrategyConfig) -> StrategySummary {
        let last = self.last_metrics();
        StrategySummary {
            strategy: strategy.clone(),
            initial_capital: self.initial_capital,
            start_date: self.first_date(),
            end_date: self.last_week().date,
            weeks: self.weeks.len(),
            missing_weeks: self.gaps.len(),
            profit: last.profit,
            roi_pct: last.roi_pct,
            total_transactions: last.total_transactions,
            total_transacted: last.total_transacted,
            total_fees: last.total_fees,
            max_drawdown: last.usd.max_drawdown,
            max_drawdown_pct: last.usd.max_drawdown_pct,
            sharpe_usd: last.usd.sharpe_ratio,
            sharpe_btc: last.btc.sharpe_ratio,
        }
    }
}

/// Final figures of one strategy, for comparison across a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategySummary {
    pub strategy: StrategyConfig,
    pub initial_capital: Quote,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub weeks: usize,
    pub missing_weeks: usize,
    pub profit: Quote,
    pub roi_pct: Quote,
    pub total_transactions: usize,
    pub total_transacted: Quote,
    pub total_fees: Quote,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_usd: Option<f64>,
    pub sharpe_btc: Option<f64>,
}
