//! Ranked asset records and weekly market snapshots.

use chrono::NaiveDate;
use std::collections::HashSet;

/// Snapshot rows read per date when no limit is configured.
pub const DEFAULT_MAX_ROWS: usize = 150;

/// A price or amount expressed in both quote currencies.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quote {
    pub usd: f64,
    pub btc: f64,
}

impl Quote {
    pub const ZERO: Quote = Quote { usd: 0.0, btc: 0.0 };

    pub fn new(usd: f64, btc: f64) -> Self {
        Quote { usd, btc }
    }

    /// Value of `units` at this price.
    pub fn times(self, units: f64) -> Quote {
        Quote {
            usd: self.usd * units,
            btc: self.btc * units,
        }
    }

    pub fn scale(self, factor: f64) -> Quote {
        self.times(factor)
    }
}

impl std::ops::Add for Quote {
    type Output = Quote;

    fn add(self, rhs: Quote) -> Quote {
        Quote {
            usd: self.usd + rhs.usd,
            btc: self.btc + rhs.btc,
        }
    }
}

impl std::ops::AddAssign for Quote {
    fn add_assign(&mut self, rhs: Quote) {
        self.usd += rhs.usd;
        self.btc += rhs.btc;
    }
}

impl std::ops::Sub for Quote {
    type Output = Quote;

    fn sub(self, rhs: Quote) -> Quote {
        Quote {
            usd: self.usd - rhs.usd,
            btc: self.btc - rhs.btc,
        }
    }
}

impl std::iter::Sum for Quote {
    fn sum<I: Iterator<Item = Quote>>(iter: I) -> Quote {
        iter.fold(Quote::ZERO, |acc, q| acc + q)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    pub rank: u32,
    pub symbol: String,
    pub name: String,
    pub market_cap_usd: f64,
    pub price: Quote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub assets: Vec<AssetRecord>,
}

impl Snapshot {
    /// Builds a snapshot sorted by rank and truncated to `max_rows`.
    pub fn new(date: NaiveDate, mut assets: Vec<AssetRecord>, max_rows: usize) -> Self {
        assets.sort_by_key(|a| a.rank);
        assets.truncate(max_rows);
        Snapshot { date, assets }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&AssetRecord> {
        self.assets.iter().find(|a| a.symbol == symbol)
    }

    pub fn price_of(&self, symbol: &str) -> Option<Quote> {
        self.get(symbol).map(|a| a.price)
    }

    /// First symbol that appears on more than one row, in rank order.
    pub fn duplicate_symbol(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.assets
            .iter()
            .map(|a| a.symbol.as_str())
            .find(|s| !seen.insert(*s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rank: u32, symbol: &str, cap: f64) -> AssetRecord {
        AssetRecord {
            rank,
            symbol: symbol.to_string(),
            name: symbol.to_lowercase(),
            market_cap_usd: cap,
            price: Quote::new(1.0, 0.0001),
        }
    }

    #[test]
    fn snapshot_sorts_by_rank() {
        let date = NaiveDate::from_ymd_opt(2018, 1, 7).unwrap();
        let snap = Snapshot::new(
            date,
            vec![record(3, "XRP", 10.0), record(1, "BTC", 100.0), record(2, "ETH", 50.0)],
            DEFAULT_MAX_ROWS,
        );
        let symbols: Vec<_> = snap.assets.iter().map(|a| a.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "ETH", "XRP"]);
    }

    #[test]
    fn snapshot_truncates_to_max_rows() {
        let date = NaiveDate::from_ymd_opt(2018, 1, 7).unwrap();
        let snap = Snapshot::new(
            date,
            vec![record(1, "BTC", 100.0), record(2, "ETH", 50.0), record(3, "XRP", 10.0)],
            2,
        );
        assert_eq!(snap.len(), 2);
        assert!(snap.get("XRP").is_none());
    }

    #[test]
    fn price_lookup() {
        let date = NaiveDate::from_ymd_opt(2018, 1, 7).unwrap();
        let snap = Snapshot::new(date, vec![record(1, "BTC", 100.0)], 10);
        assert_eq!(snap.price_of("BTC"), Some(Quote::new(1.0, 0.0001)));
        assert_eq!(snap.price_of("ETH"), None);
    }

    #[test]
    fn duplicate_symbol_detection() {
        let date = NaiveDate::from_ymd_opt(2018, 1, 7).unwrap();
        let unique = Snapshot::new(date, vec![record(1, "BTC", 100.0), record(2, "ETH", 50.0)], 10);
        assert_eq!(unique.duplicate_symbol(), None);

        let repeated = Snapshot::new(
            date,
            vec![record(1, "BTC", 100.0), record(2, "DUP", 50.0), record(3, "DUP", 10.0)],
            10,
        );
        assert_eq!(repeated.duplicate_symbol(), Some("DUP"));

        // the repeat falls outside the rows kept
        let truncated = Snapshot::new(
            date,
            vec![record(1, "BTC", 100.0), record(2, "DUP", 50.0), record(3, "DUP", 10.0)],
            2,
        );
        assert_eq!(truncated.duplicate_symbol(), None);
    }

    #[test]
    fn quote_arithmetic() {
        let a = Quote::new(10.0, 0.5);
        let b = Quote::new(2.0, 0.25);
        assert_eq!(a + b, Quote::new(12.0, 0.75));
        assert_eq!(a - b, Quote::new(8.0, 0.25));
        assert_eq!(b.times(4.0), Quote::new(8.0, 1.0));
        let total: Quote = vec![a, b].into_iter().sum();
        assert_eq!(total, Quote::new(12.0, 0.75));
    }
}
