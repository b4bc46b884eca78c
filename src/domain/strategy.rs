//! Strategy and run configuration.

use chrono::NaiveDate;
use std::fmt;

/// Parameters of one capped-weight index strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub basket_size: usize,
    pub weight_cap: f64,
    pub rebalance_period_weeks: usize,
    pub transaction_fee: f64,
}

impl StrategyConfig {
    /// Whether any weight assignment can sum to 1 without breaking the cap.
    pub fn is_feasible(&self) -> bool {
        self.basket_size as f64 * self.weight_cap >= 1.0 - 1e-9
    }

    pub fn is_rebalance_week(&self, week_index: usize) -> bool {
        week_index % self.rebalance_period_weeks == 0
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "basket {}, weight cap {:.0}%, rebalance every {} weeks",
            self.basket_size,
            self.weight_cap * 100.0,
            self.rebalance_period_weeks
        )
    }
}

/// Run-wide parameters shared by every strategy in a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub base_currency: String,
    pub max_rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_strategy() -> StrategyConfig {
        StrategyConfig {
            basket_size: 10,
            weight_cap: 0.25,
            rebalance_period_weeks: 4,
            transaction_fee: 0.001,
        }
    }

    #[test]
    fn feasible_when_basket_times_cap_reaches_one() {
        assert!(sample_strategy().is_feasible());
        let exact = StrategyConfig {
            basket_size: 4,
            ..sample_strategy()
        };
        assert!(exact.is_feasible());
    }

    #[test]
    fn infeasible_when_basket_too_small() {
        let s = StrategyConfig {
            basket_size: 3,
            weight_cap: 0.3,
            ..sample_strategy()
        };
        assert!(!s.is_feasible());
    }

    #[test]
    fn rebalance_schedule() {
        let s = sample_strategy();
        assert!(s.is_rebalance_week(0));
        assert!(!s.is_rebalance_week(1));
        assert!(!s.is_rebalance_week(3));
        assert!(s.is_rebalance_week(4));
        assert!(s.is_rebalance_week(8));
    }

    #[test]
    fn display() {
        assert_eq!(
            sample_strategy().to_string(),
            "basket 10, weight cap 25%, rebalance every 4 weeks"
        );
    }
}
