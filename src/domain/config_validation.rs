//! Configuration validation.
//!
//! Validates all config fields before any simulation runs.

use crate::domain::error::CapweightError;
use crate::domain::sweep::parse_list;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_WEIGHT_CAPS: &str = "1.0";
pub const DEFAULT_REBALANCE_PERIODS: &str = "1";

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), CapweightError> {
    validate_initial_capital(config)?;
    validate_dates(config)?;
    validate_base_currency(config)?;
    validate_max_rows(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), CapweightError> {
    validate_basket_sizes(config)?;
    validate_weight_caps(config)?;
    validate_rebalance_periods(config)?;
    validate_transaction_fee(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> CapweightError {
    CapweightError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Parses a present value, rejecting text that is not a `T`. Absent keys yield `None`.
fn parse_value<T: std::str::FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, CapweightError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("'{}' is not a valid number", raw.trim()))),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), CapweightError> {
    let value: f64 = parse_value(config, "backtest", "initial_capital")?.unwrap_or(0.0);
    if value <= 0.0 || !value.is_finite() {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), CapweightError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, CapweightError> {
    match value {
        None => Err(CapweightError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_base_currency(config: &dyn ConfigPort) -> Result<(), CapweightError> {
    match config.get_string("backtest", "base_currency") {
        Some(s) if s.trim().is_empty() => Err(invalid(
            "backtest",
            "base_currency",
            "base_currency must not be empty",
        )),
        _ => Ok(()),
    }
}

fn validate_max_rows(config: &dyn ConfigPort) -> Result<(), CapweightError> {
    let value: i64 = parse_value(config, "backtest", "max_rows")?.unwrap_or(1);
    if value < 1 {
        return Err(invalid("backtest", "max_rows", "max_rows must be at least 1"));
    }
    Ok(())
}

/// Parses a `[strategy]` list, falling back to `default` when the key is absent.
pub fn strategy_list<T>(
    config: &dyn ConfigPort,
    key: &str,
    default: Option<&str>,
) -> Result<Vec<T>, CapweightError>
where
    T: std::str::FromStr + std::fmt::Display,
{
    let raw = match config.get_string("strategy", key) {
        Some(s) => s,
        None => match default {
            Some(d) => d.to_string(),
            None => {
                return Err(CapweightError::ConfigMissing {
                    section: "strategy".to_string(),
                    key: key.to_string(),
                });
            }
        },
    };
    parse_list(&raw).map_err(|e| invalid("strategy", key, e.to_string()))
}

fn validate_basket_sizes(config: &dyn ConfigPort) -> Result<(), CapweightError> {
    let sizes: Vec<usize> = strategy_list(config, "basket_sizes", None)?;
    if sizes.contains(&0) {
        return Err(invalid(
            "strategy",
            "basket_sizes",
            "basket sizes must be at least 1",
        ));
    }
    Ok(())
}

fn validate_weight_caps(config: &dyn ConfigPort) -> Result<(), CapweightError> {
    let caps: Vec<f64> = strategy_list(config, "weight_caps", Some(DEFAULT_WEIGHT_CAPS))?;
    if caps.iter().any(|&c| !(c > 0.0 && c <= 1.0)) {
        return Err(invalid(
            "strategy",
            "weight_caps",
            "weight caps must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_rebalance_periods(config: &dyn ConfigPort) -> Result<(), CapweightError> {
    let periods: Vec<usize> =
        strategy_list(config, "rebalance_periods", Some(DEFAULT_REBALANCE_PERIODS))?;
    if periods.contains(&0) {
        return Err(invalid(
            "strategy",
            "rebalance_periods",
            "rebalance periods must be at least 1 week",
        ));
    }
    Ok(())
}

fn validate_transaction_fee(config: &dyn ConfigPort) -> Result<(), CapweightError> {
    let value: f64 = parse_value(config, "strategy", "transaction_fee")?.unwrap_or(0.0);
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(
            "strategy",
            "transaction_fee",
            "transaction_fee must be between 0 and 1",
        ));
    }
    Ok(())
}
