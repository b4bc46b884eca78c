//! Parameter grid sweep.
//!
//! Parses the configured parameter lists, expands them into strategies and
//! runs one backtest per feasible combination. Infeasible combinations are
//! recorded without running and failed runs do not stop the sweep.

use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;

use tracing::info;

use super::backtest::run_backtest;
use super::error::SimulationError;
use super::metrics::{ResultSeries, StrategySummary};
use super::strategy::{RunConfig, StrategyConfig};
use crate::ports::snapshot_port::SnapshotPort;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterListError {
    #[error("empty token in parameter list")]
    EmptyToken,

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Parses a comma-separated list. Duplicates are dropped, first one wins.
pub fn parse_list<T>(input: &str) -> Result<Vec<T>, ParameterListError>
where
    T: FromStr + Display,
{
    let mut values = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(ParameterListError::EmptyToken);
        }
        let value: T = trimmed
            .parse()
            .map_err(|_| ParameterListError::InvalidValue(trimmed.to_string()))?;
        // compare on the rendered value so f64 lists dedupe too
        if seen.insert(value.to_string()) {
            values.push(value);
        }
    }

    Ok(values)
}

/// Every combination of basket size, weight cap and rebalance period.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepGrid {
    pub basket_sizes: Vec<usize>,
    pub weight_caps: Vec<f64>,
    pub rebalance_periods: Vec<usize>,
    pub transaction_fee: f64,
}

impl SweepGrid {
    pub fn len(&self) -> usize {
        self.basket_sizes.len() * self.weight_caps.len() * self.rebalance_periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Strategies in basket, cap, period nesting order.
    pub fn strategies(&self) -> Vec<StrategyConfig> {
        let mut out = Vec::with_capacity(self.len());
        for &basket_size in &self.basket_sizes {
            for &weight_cap in &self.weight_caps {
                for &rebalance_period_weeks in &self.rebalance_periods {
                    out.push(StrategyConfig {
                        basket_size,
                        weight_cap,
                        rebalance_period_weeks,
                        transaction_fee: self.transaction_fee,
                    });
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(ResultSeries),
    Infeasible,
    Failed(SimulationError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRun {
    pub strategy: StrategyConfig,
    pub outcome: RunOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub runs: Vec<StrategyRun>,
}

impl SweepReport {
    pub fn completed(&self) -> impl Iterator<Item = (&StrategyConfig, &ResultSeries)> {
        self.runs.iter().filter_map(|r| match &r.outcome {
            RunOutcome::Completed(series) => Some((&r.strategy, series)),
            _ => None,
        })
    }

    pub fn summaries(&self) -> Vec<StrategySummary> {
        self.completed().map(|(s, series)| series.summary(s)).collect()
    }

    pub fn infeasible(&self) -> impl Iterator<Item = &StrategyConfig> {
        self.runs
            .iter()
            .filter(|r| matches!(r.outcome, RunOutcome::Infeasible))
            .map(|r| &r.strategy)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&StrategyConfig, &SimulationError)> {
        self.runs.iter().filter_map(|r| match &r.outcome {
            RunOutcome::Failed(err) => Some((&r.strategy, err)),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

pub fn run_sweep(port: &dyn SnapshotPort, grid: &SweepGrid, run: &RunConfig) -> SweepReport {
    let strategies = grid.strategies();
    let total = strategies.len();
    let mut report = SweepReport::default();

    for (i, strategy) in strategies.into_iter().enumerate() {
        let outcome = if !strategy.is_feasible() {
            info!(%strategy, "ignoring infeasible strategy");
            RunOutcome::Infeasible
        } else {
            info!(%strategy, "testing strategy {} of {}", i + 1, total);
            match run_backtest(port, &strategy, run) {
                Ok(series) => RunOutcome::Completed(series),
                Err(err) => RunOutcome::Failed(err),
            }
        };
        report.runs.push(StrategyRun { strategy, outcome });
    }

    report
}
