//! Unit holdings and their valuation.

use std::collections::BTreeMap;

use super::asset::Quote;

/// Units held per symbol. Replaced wholesale on rebalance weeks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Holdings {
    units: BTreeMap<String, f64>,
}

impl Holdings {
    pub fn new() -> Self {
        Holdings::default()
    }

    /// All capital in a single symbol.
    pub fn single(symbol: &str, units: f64) -> Self {
        Holdings::from_units([(symbol.to_string(), units)])
    }

    /// Builds holdings, dropping zero quantities.
    pub fn from_units<I>(units: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        Holdings {
            units: units.into_iter().filter(|(_, u)| *u != 0.0).collect(),
        }
    }

    pub fn units(&self, symbol: &str) -> f64 {
        self.units.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.units.contains_key(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Copy with every position multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Holdings {
        Holdings::from_units(self.units.iter().map(|(s, &u)| (s.clone(), u * factor)))
    }

    /// Total value; symbols without a price contribute nothing.
    pub fn value<F>(&self, price_of: F) -> Quote
    where
        F: Fn(&str) -> Option<Quote>,
    {
        self.units
            .iter()
            .filter_map(|(symbol, &units)| price_of(symbol).map(|p| p.times(units)))
            .sum()
    }
}
