//! Week-by-week portfolio simulation.
//!
//! [`PortfolioSimulator`] owns the holdings of one run. Each call to
//! [`PortfolioSimulator::step`] consumes the snapshot for one weekly date and
//! returns a [`WeekOutcome`]:
//!
//! 1. Value the previous holdings at this week's prices.
//! 2. Ask the allocator for target weights and derive target units.
//! 3. On rebalance weeks (`week_index % period == 0`), trade every non-base
//!    asset against the base currency to reach the targets and charge the fee.
//! 4. Otherwise carry the holdings forward unchanged.
//!
//! Unusable snapshots are reported as [`WeekOutcome::Skipped`] and leave the
//! simulator untouched; allocation failures are [`WeekOutcome::Failed`].

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::allocation::{Allocation, allocate};
use super::asset::{Quote, Snapshot};
use super::error::{SimulationError, SnapshotError};
use super::holdings::Holdings;
use super::strategy::{RunConfig, StrategyConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub source: String,
    pub destination: String,
    pub size: f64,
    pub price: Quote,
    pub amount: Quote,
}

/// Per-week summary consumed by the metrics aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekResult {
    pub date: NaiveDate,
    pub week_index: usize,
    pub rebalanced: bool,
    pub equity: Quote,
    pub transactions: usize,
    pub transacted: Quote,
    pub fees: Quote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekReport {
    pub result: WeekResult,
    /// Equity of the previous holdings at this week's prices, before trading.
    pub opening_equity: Quote,
    pub transactions: Vec<Transaction>,
    pub allocation: Allocation,
}

/// An expected weekly date that produced no result.
#[derive(Debug, Clone, PartialEq)]
pub struct Gap {
    pub date: NaiveDate,
    pub reason: SnapshotError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeekOutcome {
    Completed(WeekReport),
    Skipped(Gap),
    Failed(SimulationError),
}

struct Rebalance {
    holdings: Holdings,
    transactions: Vec<Transaction>,
    transacted: Quote,
    fees: Quote,
}

pub struct PortfolioSimulator {
    strategy: StrategyConfig,
    base_currency: String,
    initial_capital: f64,
    holdings: Holdings,
    week_index: usize,
    prices: HashMap<String, Quote>,
}

impl PortfolioSimulator {
    pub fn new(strategy: StrategyConfig, run: &RunConfig) -> Self {
        PortfolioSimulator {
            strategy,
            base_currency: run.base_currency.clone(),
            initial_capital: run.initial_capital,
            holdings: Holdings::new(),
            week_index: 0,
            prices: HashMap::new(),
        }
    }

    pub fn holdings(&self) -> &Holdings {
        &self.holdings
    }

    /// Index of the next week to be processed. Skipped weeks do not count.
    pub fn week_index(&self) -> usize {
        self.week_index
    }

    /// Last known price of `symbol`.
    pub fn price_of(&self, symbol: &str) -> Option<Quote> {
        self.prices.get(symbol).copied()
    }

    /// Current holdings at the last known prices.
    pub fn equity(&self) -> Quote {
        self.holdings.value(|s| self.price_of(s))
    }

    pub fn step(&mut self, date: NaiveDate, fetched: Result<Snapshot, SnapshotError>) -> WeekOutcome {
        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(reason) => return WeekOutcome::Skipped(Gap { date, reason }),
        };
        if let Some(symbol) = snapshot.duplicate_symbol() {
            return WeekOutcome::Skipped(Gap {
                date,
                reason: SnapshotError::Corrupt {
                    date,
                    reason: format!("duplicate symbol {}", symbol),
                },
            });
        }

        let base_price = match snapshot.price_of(&self.base_currency) {
            Some(price) if price.usd > 0.0 => price,
            _ => {
                return WeekOutcome::Skipped(Gap {
                    date,
                    reason: SnapshotError::MissingBaseCurrency {
                        date,
                        symbol: self.base_currency.clone(),
                    },
                });
            }
        };

        let allocation = match allocate(
            &snapshot,
            self.strategy.basket_size,
            self.strategy.weight_cap,
        ) {
            Ok(allocation) => allocation,
            Err(source) => return WeekOutcome::Failed(SimulationError::Allocation { date, source }),
        };

        if let Some(asset) = snapshot
            .assets
            .iter()
            .enumerate()
            .find(|(i, a)| allocation.weight_at(*i) > 0.0 && a.price.usd <= 0.0)
            .map(|(_, a)| a)
        {
            return WeekOutcome::Skipped(Gap {
                date,
                reason: SnapshotError::InvalidPrice {
                    date,
                    symbol: asset.symbol.clone(),
                },
            });
        }

        // The snapshot is usable from here on; state changes are committed.
        for asset in &snapshot.assets {
            self.prices.insert(asset.symbol.clone(), asset.price);
        }
        for symbol in self.holdings.symbols() {
            if snapshot.get(symbol).is_none() {
                warn!(%date, symbol, "held asset missing from snapshot, using last known price");
            }
        }

        if self.week_index == 0 {
            let units = self.initial_capital / base_price.usd;
            self.holdings = Holdings::single(&self.base_currency, units);
        }

        let opening_equity = self.equity();
        let rebalanced = self.strategy.is_rebalance_week(self.week_index);

        let (transactions, transacted, fees) = if rebalanced {
            let rebalance = self.rebalance(&snapshot, &allocation, opening_equity);
            self.holdings = rebalance.holdings;
            (rebalance.transactions, rebalance.transacted, rebalance.fees)
        } else {
            (Vec::new(), Quote::ZERO, Quote::ZERO)
        };

        let equity = self.equity();
        debug!(
            %date,
            week = self.week_index,
            rebalanced,
            equity_usd = equity.usd,
            equity_btc = equity.btc,
            transactions = transactions.len(),
            fees_usd = fees.usd,
            "week processed"
        );

        let result = WeekResult {
            date,
            week_index: self.week_index,
            rebalanced,
            equity,
            transactions: transactions.len(),
            transacted,
            fees,
        };
        self.week_index += 1;

        WeekOutcome::Completed(WeekReport {
            result,
            opening_equity,
            transactions,
            allocation,
        })
    }

    fn rebalance(&self, snapshot: &Snapshot, allocation: &Allocation, equity: Quote) -> Rebalance {
        let targets: Vec<(String, f64)> = snapshot
            .assets
            .iter()
            .enumerate()
            .filter_map(|(i, asset)| {
                let weight = allocation.weight_at(i);
                (weight > 0.0).then(|| (asset.symbol.clone(), weight * equity.usd / asset.price.usd))
            })
            .collect();
        let target_holdings = Holdings::from_units(targets);

        // Snapshot order first, then positions that fell out of the snapshot.
        let mut symbols: Vec<&str> = snapshot.assets.iter().map(|a| a.symbol.as_str()).collect();
        symbols.extend(self.holdings.symbols().filter(|s| snapshot.get(s).is_none()));

        let mut sells = Vec::new();
        let mut buys = Vec::new();
        for symbol in symbols {
            if symbol == self.base_currency {
                continue;
            }
            let diff = target_holdings.units(symbol) - self.holdings.units(symbol);
            if diff == 0.0 {
                continue;
            }
            let Some(price) = self.price_of(symbol) else {
                continue;
            };
            let size = diff.abs();
            let (source, destination, side) = if diff < 0.0 {
                (symbol.to_string(), self.base_currency.clone(), &mut sells)
            } else {
                (self.base_currency.clone(), symbol.to_string(), &mut buys)
            };
            side.push(Transaction {
                date: snapshot.date,
                source,
                destination,
                size,
                price,
                amount: price.times(size),
            });
        }

        let transactions: Vec<Transaction> = sells.into_iter().chain(buys).collect();
        let transacted: Quote = transactions.iter().map(|t| t.amount).sum();

        let mut holdings = target_holdings;
        let mut fees = Quote::ZERO;
        if self.strategy.transaction_fee > 0.0 {
            fees = transacted.scale(self.strategy.transaction_fee);
            let gross = holdings.value(|s| self.price_of(s));
            if gross.usd > 0.0 {
                let keep = (1.0 - fees.usd / gross.usd).max(0.0);
                holdings = holdings.scaled(keep);
            }
            debug!(
                date = %snapshot.date,
                fee_usd = fees.usd,
                fee_btc = fees.btc,
                "transaction fees charged"
            );
        }

        Rebalance {
            holdings,
            transactions,
            transacted,
            fees,
        }
    }
}
