//! Domain error types.

use chrono::NaiveDate;

/// Failure to produce target weights for a snapshot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocationError {
    #[error(
        "infeasible configuration: {eligible} eligible assets with weight cap {weight_cap} cannot sum to 1"
    )]
    Infeasible { eligible: usize, weight_cap: f64 },

    #[error("weights did not converge after {iterations} iterations (sum {sum:.6})")]
    NotConverged { iterations: usize, sum: f64 },

    #[error("basket has no assets with a positive market cap")]
    EmptyBasket,
}

/// Why a weekly snapshot could not be used.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    #[error("no snapshot available for {date}")]
    Missing { date: NaiveDate },

    #[error("unreadable snapshot for {date}: {reason}")]
    Corrupt { date: NaiveDate, reason: String },

    #[error("snapshot for {date} has no price for base currency {symbol}")]
    MissingBaseCurrency { date: NaiveDate, symbol: String },

    #[error("snapshot for {date} has non-positive price for {symbol}")]
    InvalidPrice { date: NaiveDate, symbol: String },
}

/// Fatal failure of a single simulation run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("allocation failed on {date}: {source}")]
    Allocation {
        date: NaiveDate,
        #[source]
        source: AllocationError,
    },

    #[error("no usable snapshot between {start} and {end}")]
    NoData { start: NaiveDate, end: NaiveDate },
}

/// Top-level error type for capweight.
#[derive(Debug, thiserror::Error)]
pub enum CapweightError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&CapweightError> for std::process::ExitCode {
    fn from(err: &CapweightError) -> Self {
        let code: u8 = match err {
            CapweightError::Io(_) | CapweightError::Report { .. } => 1,
            CapweightError::ConfigParse { .. }
            | CapweightError::ConfigMissing { .. }
            | CapweightError::ConfigInvalid { .. } => 2,
            CapweightError::Simulation(SimulationError::NoData { .. }) => 5,
            CapweightError::Simulation(SimulationError::Allocation { .. }) => 6,
        };
        std::process::ExitCode::from(code)
    }
}
