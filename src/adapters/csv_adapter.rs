//! CSV snapshot adapter.
//!
//! Reads one `YYYY-MM-DD.csv` file per weekly date from a data directory.
//! Files are `;`-delimited with a header row; only the rank, name, symbol,
//! market cap and price columns are consumed.

use crate::domain::asset::{AssetRecord, Quote, Snapshot};
use crate::domain::error::SnapshotError;
use crate::ports::snapshot_port::SnapshotPort;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// Placeholder the data source uses for unknown figures.
const UNKNOWN: &str = "?";

const REQUIRED_COLUMNS: [&str; 6] = [
    "rank",
    "name",
    "symbol",
    "marketcapusd",
    "priceusd",
    "pricebtc",
];

pub struct CsvSnapshotAdapter {
    base_path: PathBuf,
}

impl CsvSnapshotAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, date: NaiveDate) -> PathBuf {
        self.base_path.join(format!("{}.csv", date.format("%Y-%m-%d")))
    }
}

fn parse_amount(value: &str, column: &str) -> Result<f64, String> {
    let value = value.trim();
    if value.is_empty() || value == UNKNOWN {
        return Ok(0.0);
    }
    value
        .parse()
        .map_err(|e| format!("invalid {} value '{}': {}", column, value, e))
}

impl SnapshotPort for CsvSnapshotAdapter {
    fn fetch_snapshot(&self, date: NaiveDate, max_rows: usize) -> Result<Snapshot, SnapshotError> {
        let path = self.csv_path(date);
        let corrupt = |reason: String| SnapshotError::Corrupt { date, reason };

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SnapshotError::Missing { date });
            }
            Err(e) => {
                return Err(corrupt(format!("failed to read {}: {}", path.display(), e)));
            }
        };
        debug!(path = %path.display(), "reading snapshot");

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| corrupt(format!("CSV header error: {}", e)))?
            .clone();
        let mut columns = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| corrupt(format!("missing {} column", name)))?;
        }
        let [rank_col, name_col, symbol_col, cap_col, usd_col, btc_col] = columns;

        let mut assets = Vec::new();
        for result in rdr.records().take(max_rows) {
            let record = result.map_err(|e| corrupt(format!("CSV parse error: {}", e)))?;
            let field = |i: usize| record.get(i).unwrap_or_default();

            let rank: u32 = field(rank_col)
                .parse()
                .map_err(|e| corrupt(format!("invalid rank '{}': {}", field(rank_col), e)))?;
            let market_cap_usd = parse_amount(field(cap_col), "marketcapusd").map_err(corrupt)?;
            let usd = parse_amount(field(usd_col), "priceusd").map_err(corrupt)?;
            let btc = parse_amount(field(btc_col), "pricebtc").map_err(corrupt)?;

            assets.push(AssetRecord {
                rank,
                symbol: field(symbol_col).to_string(),
                name: field(name_col).to_string(),
                market_cap_usd,
                price: Quote::new(usd, btc),
            });
        }

        if assets.is_empty() {
            return Err(corrupt("no asset rows".to_string()));
        }

        let snapshot = Snapshot::new(date, assets, max_rows);
        if let Some(symbol) = snapshot.duplicate_symbol() {
            return Err(corrupt(format!("duplicate symbol {}", symbol)));
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "date;rank;name;symbol;marketcapusd;priceusd;pricebtc;circulatingsupply;volume24h;perf1h;perf24h;perf7d\n";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 1, 7).unwrap()
    }

    fn setup_test_data(body: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        fs::write(path.join("2018-01-07.csv"), format!("{HEADER}{body}")).unwrap();
        (dir, path)
    }

    #[test]
    fn fetch_snapshot_returns_ranked_records() {
        let (_dir, path) = setup_test_data(
            "2018-01-07;2;Ethereum;ETH;110000000000;1150.5;0.0682;95000000;4000000000;0.1;2.0;30.0\n\
             2018-01-07;1;Bitcoin;BTC;285000000000;16900.0;1.0;16800000;13000000000;0.2;1.0;10.0\n",
        );
        let adapter = CsvSnapshotAdapter::new(path);
        let snap = adapter.fetch_snapshot(date(), 150).unwrap();

        assert_eq!(snap.date, date());
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.assets[0].symbol, "BTC");
        assert_eq!(snap.assets[0].name, "Bitcoin");
        assert_eq!(snap.assets[0].rank, 1);
        assert_eq!(snap.assets[0].market_cap_usd, 285_000_000_000.0);
        assert_eq!(snap.assets[1].price, Quote::new(1150.5, 0.0682));
    }

    #[test]
    fn unknown_market_cap_reads_as_zero() {
        let (_dir, path) = setup_test_data(
            "2018-01-07;1;Bitcoin;BTC;285000000000;16900.0;1.0;?;?;?;?;?\n\
             2018-01-07;2;Mystery;MYS;?;0.5;0.00003;?;?;?;?;?\n",
        );
        let adapter = CsvSnapshotAdapter::new(path);
        let snap = adapter.fetch_snapshot(date(), 150).unwrap();
        assert_eq!(snap.get("MYS").unwrap().market_cap_usd, 0.0);
    }

    #[test]
    fn reads_at_most_max_rows() {
        let body: String = (1..=5)
            .map(|i| format!("2018-01-07;{i};Coin{i};C{i};{};1.0;0.0001;0;0;0;0;0\n", 1000 - i))
            .collect();
        let (_dir, path) = setup_test_data(&body);
        let adapter = CsvSnapshotAdapter::new(path);
        let snap = adapter.fetch_snapshot(date(), 3).unwrap();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.assets[2].symbol, "C3");
    }

    #[test]
    fn missing_file_is_missing() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvSnapshotAdapter::new(dir.path().to_path_buf());
        let err = adapter.fetch_snapshot(date(), 150).unwrap_err();
        assert_eq!(err, SnapshotError::Missing { date: date() });
    }

    #[test]
    fn bad_number_is_corrupt() {
        let (_dir, path) = setup_test_data("2018-01-07;1;Bitcoin;BTC;lots;16900.0;1.0;0;0;0;0;0\n");
        let adapter = CsvSnapshotAdapter::new(path);
        let err = adapter.fetch_snapshot(date(), 150).unwrap_err();
        assert!(matches!(err, SnapshotError::Corrupt { reason, .. } if reason.contains("marketcapusd")));
    }

    #[test]
    fn missing_column_is_corrupt() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("2018-01-07.csv"),
            "date;rank;name;symbol;marketcapusd;priceusd\n2018-01-07;1;Bitcoin;BTC;1;1\n",
        )
        .unwrap();
        let adapter = CsvSnapshotAdapter::new(dir.path().to_path_buf());
        let err = adapter.fetch_snapshot(date(), 150).unwrap_err();
        assert!(matches!(err, SnapshotError::Corrupt { reason, .. } if reason.contains("pricebtc")));
    }

    #[test]
    fn header_only_file_is_corrupt() {
        let (_dir, path) = setup_test_data("");
        let adapter = CsvSnapshotAdapter::new(path);
        assert!(matches!(
            adapter.fetch_snapshot(date(), 150),
            Err(SnapshotError::Corrupt { .. })
        ));
    }

    #[test]
    fn repeated_symbol_is_corrupt() {
        let (_dir, path) = setup_test_data(
            "2018-01-07;1;Bitcoin;BTC;500;10000;1.0;0;0;0;0;0\n\
             2018-01-07;2;Dupcoin;DUP;300;1;0.0001;0;0;0;0;0\n\
             2018-01-07;3;Dupcoin Classic;DUP;200;2;0.0002;0;0;0;0;0\n",
        );
        let adapter = CsvSnapshotAdapter::new(path);
        let err = adapter.fetch_snapshot(date(), 150).unwrap_err();
        assert!(matches!(err, SnapshotError::Corrupt { reason, .. } if reason.contains("DUP")));
    }
}
