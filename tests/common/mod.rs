#![allow(dead_code)]

use capweight::domain::asset::{AssetRecord, Quote, Snapshot};
use capweight::domain::error::SnapshotError;
use capweight::domain::strategy::{RunConfig, StrategyConfig};
use capweight::ports::snapshot_port::SnapshotPort;
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::HashMap;

/// In-memory snapshot source. Dates without a snapshot are reported missing.
pub struct MockSnapshotPort {
    pub snapshots: HashMap<NaiveDate, Snapshot>,
    pub errors: HashMap<NaiveDate, String>,
    pub requests: RefCell<Vec<NaiveDate>>,
}

impl MockSnapshotPort {
    pub fn new() -> Self {
        Self {
            snapshots: HashMap::new(),
            errors: HashMap::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshots.insert(snapshot.date, snapshot);
        self
    }

    pub fn with_error(mut self, date: NaiveDate, reason: &str) -> Self {
        self.errors.insert(date, reason.to_string());
        self
    }
}

impl SnapshotPort for MockSnapshotPort {
    fn fetch_snapshot(&self, date: NaiveDate, max_rows: usize) -> Result<Snapshot, SnapshotError> {
        self.requests.borrow_mut().push(date);
        if let Some(reason) = self.errors.get(&date) {
            return Err(SnapshotError::Corrupt {
                date,
                reason: reason.clone(),
            });
        }
        match self.snapshots.get(&date) {
            Some(s) => Ok(Snapshot::new(date, s.assets.clone(), max_rows)),
            None => Err(SnapshotError::Missing { date }),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `count` weekly dates starting at `start`.
pub fn weeks_from(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (0..count)
        .map(|i| start + chrono::Duration::weeks(i as i64))
        .collect()
}

/// Asset row with the BTC price derived from `btc_usd`.
pub fn asset(rank: u32, symbol: &str, market_cap: f64, usd: f64, btc_usd: f64) -> AssetRecord {
    AssetRecord {
        rank,
        symbol: symbol.to_string(),
        name: symbol.to_lowercase(),
        market_cap_usd: market_cap,
        price: Quote::new(usd, usd / btc_usd),
    }
}

/// Snapshot from `(symbol, market_cap, price_usd)` tuples in rank order.
/// The first tuple must be BTC.
pub fn make_snapshot(d: NaiveDate, rows: &[(&str, f64, f64)]) -> Snapshot {
    let btc_usd = rows[0].2;
    let assets = rows
        .iter()
        .enumerate()
        .map(|(i, &(symbol, cap, usd))| asset(i as u32 + 1, symbol, cap, usd, btc_usd))
        .collect();
    Snapshot::new(d, assets, 150)
}

/// Deterministic four-asset market drifting week over week.
pub fn drifting_snapshot(d: NaiveDate, week: usize) -> Snapshot {
    let w = week as f64;
    let btc = 10_000.0 * (1.0 + 0.05 * (w * 0.7).sin());
    let eth = 600.0 * (1.0 + 0.02 * w);
    let xrp = 1.0 + 0.1 * (w * 1.3).cos();
    let ltc = 200.0 * (1.0 - 0.01 * w);
    make_snapshot(
        d,
        &[
            ("BTC", btc * 16.0e6, btc),
            ("ETH", eth * 95.0e6, eth),
            ("XRP", xrp * 38.0e9, xrp),
            ("LTC", ltc * 54.0e6, ltc),
        ],
    )
}

pub fn run_config(start: NaiveDate, end: NaiveDate) -> RunConfig {
    RunConfig {
        start_date: start,
        end_date: end,
        initial_capital: 10_000.0,
        base_currency: "BTC".to_string(),
        max_rows: 150,
    }
}

pub fn strategy(basket_size: usize, weight_cap: f64, period: usize, fee: f64) -> StrategyConfig {
    StrategyConfig {
        basket_size,
        weight_cap,
        rebalance_period_weeks: period,
        transaction_fee: fee,
    }
}

/// Port with a drifting snapshot for each of `count` weeks from `start`.
pub fn drifting_port(start: NaiveDate, count: usize) -> MockSnapshotPort {
    weeks_from(start, count)
        .into_iter()
        .enumerate()
        .fold(MockSnapshotPort::new(), |port, (i, d)| {
            port.with_snapshot(drifting_snapshot(d, i))
        })
}

pub const SNAPSHOT_HEADER: &str =
    "date;rank;name;symbol;marketcapusd;priceusd;pricebtc;circulatingsupply;volume24h;perf1h;perf24h;perf7d";

/// Renders a snapshot in the on-disk `;`-delimited format.
pub fn snapshot_csv(snapshot: &Snapshot) -> String {
    let mut out = String::from(SNAPSHOT_HEADER);
    out.push('\n');
    for a in &snapshot.assets {
        out.push_str(&format!(
            "{};{};{};{};{};{};{};0;0;0;0;0\n",
            snapshot.date, a.rank, a.name, a.symbol, a.market_cap_usd, a.price.usd, a.price.btc
        ));
    }
    out
}
