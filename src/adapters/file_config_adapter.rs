//! INI file configuration adapter.
//!
//! Backs [`ConfigPort`] with a `configparser` document holding the
//! `[backtest]`, `[strategy]` and `[output]` sections. Command-line flags are
//! written into the same document through [`FileConfigAdapter::set`] before
//! validation, so every reader sees the merged values.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(|e| std::io::Error::other(e))?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    /// Overrides a single value, creating the section when needed. Used for
    /// command-line flags, which take precedence over the file.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.config.set(section, key, Some(value.into()));
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[backtest]
start_date = 2018-01-07
base_currency = BTC

[strategy]
basket_sizes = 5,10,20
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "base_currency"),
            Some("BTC".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "basket_sizes"),
            Some("5,10,20".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ninitial_capital = 100\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nmax_rows = 50\n").unwrap();
        assert_eq!(adapter.get_int("backtest", "max_rows", 0), 50);
    }

    #[test]
    fn get_int_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        assert_eq!(adapter.get_int("backtest", "missing", 42), 42);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nmax_rows = abc\n").unwrap();
        assert_eq!(adapter.get_int("backtest", "max_rows", 42), 42);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ninitial_capital = 10000.5\n").unwrap();
        assert_eq!(adapter.get_double("backtest", "initial_capital", 0.0), 10000.5);
    }

    #[test]
    fn get_double_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[strategy]\n").unwrap();
        assert_eq!(adapter.get_double("strategy", "transaction_fee", 0.0), 0.0);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\ntransaction_fee = cheap\n").unwrap();
        assert_eq!(adapter.get_double("strategy", "transaction_fee", 99.9), 99.9);
    }

    #[test]
    fn get_bool_returns_true_values() {
        let adapter =
            FileConfigAdapter::from_string("[output]\na = true\nb = yes\nc = 1\n").unwrap();
        assert!(adapter.get_bool("output", "a", false));
        assert!(adapter.get_bool("output", "b", false));
        assert!(adapter.get_bool("output", "c", false));
    }

    #[test]
    fn get_bool_returns_false_values() {
        let adapter =
            FileConfigAdapter::from_string("[output]\na = false\nb = no\nc = 0\n").unwrap();
        assert!(!adapter.get_bool("output", "a", true));
        assert!(!adapter.get_bool("output", "b", true));
        assert!(!adapter.get_bool("output", "c", true));
    }

    #[test]
    fn get_bool_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[output]\n").unwrap();
        assert!(adapter.get_bool("output", "json", true));
        assert!(!adapter.get_bool("output", "json", false));
    }

    #[test]
    fn set_overrides_and_adds_values() {
        let mut adapter =
            FileConfigAdapter::from_string("[strategy]\nbasket_sizes = 5\n").unwrap();
        adapter.set("strategy", "basket_sizes", "10,20");
        adapter.set("output", "json", "true");
        assert_eq!(
            adapter.get_string("strategy", "basket_sizes"),
            Some("10,20".to_string())
        );
        assert!(adapter.get_bool("output", "json", false));
    }

    #[test]
    fn from_file_reads_config() {
        let content = "[output]\ndir = /tmp/results\n";
        let file = create_temp_config(content);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("output", "dir"),
            Some("/tmp/results".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }

    #[test]
    fn handles_all_config_sections() {
        let content = r#"
[backtest]
start_date = 2017-01-01
end_date = 2018-01-01
initial_capital = 10000
data_dir = data

[strategy]
weight_caps = 0.1,0.25,1.0
transaction_fee = 0.001

[output]
json = yes
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();

        assert_eq!(
            adapter.get_double("backtest", "initial_capital", 0.0),
            10000.0
        );
        assert_eq!(adapter.get_string("backtest", "data_dir"), Some("data".to_string()));
        assert_eq!(
            adapter.get_string("strategy", "weight_caps"),
            Some("0.1,0.25,1.0".to_string())
        );
        assert_eq!(adapter.get_double("strategy", "transaction_fee", 0.0), 0.001);
        assert!(adapter.get_bool("output", "json", false));
    }
}
