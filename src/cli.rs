//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvSnapshotAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::file_report_adapter::FileReportAdapter;
use crate::domain::asset::DEFAULT_MAX_ROWS;
use crate::domain::config_validation::{
    DEFAULT_REBALANCE_PERIODS, DEFAULT_WEIGHT_CAPS, parse_date, strategy_list,
    validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::CapweightError;
use crate::domain::metrics::StrategySummary;
use crate::domain::strategy::RunConfig;
use crate::domain::sweep::{SweepGrid, SweepReport, run_sweep};
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use crate::ports::snapshot_port::SnapshotPort;

pub const DEFAULT_BASE_CURRENCY: &str = "BTC";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "capweight", about = "Capped-weight crypto index backtester")]
pub struct Cli {
    /// Log verbosity: 0=error, 1=warn, 2=info, 3=debug, 4=trace (RUST_LOG wins)
    #[arg(
        short,
        long,
        global = true,
        default_value_t = 2,
        value_parser = clap::value_parser!(u8).range(0..=4)
    )]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every strategy of the configured parameter grid
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Validate a configuration file and print the resolved grid
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// First weekly date (YYYY-MM-DD)
    #[arg(short, long)]
    pub start_date: Option<String>,
    /// Last weekly date (YYYY-MM-DD), inclusive
    #[arg(short, long)]
    pub end_date: Option<String>,
    /// Directory holding the weekly snapshot files
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,
    /// Initial capital in USD
    #[arg(long)]
    pub initial_capital: Option<f64>,
    /// Comma-separated basket sizes
    #[arg(long)]
    pub basket_sizes: Option<String>,
    /// Comma-separated weight caps, fractions in (0, 1]
    #[arg(long)]
    pub weight_caps: Option<String>,
    /// Comma-separated rebalance periods in weeks
    #[arg(long)]
    pub rebalance_periods: Option<String>,
    /// Transaction fee as a fraction of the transacted amount
    #[arg(short, long)]
    pub fee: Option<f64>,
    /// Also write the equity lines as JSON
    #[arg(short, long)]
    pub json: bool,
    /// Directory for result files (defaults to the data directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Where and what to write.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub json: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbosity);
    match cli.command {
        Command::Backtest { config, overrides } => run_backtest(&config, &overrides),
        Command::Validate { config, overrides } => run_validate(&config, &overrides),
    }
}

pub fn verbosity_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    }
}

/// Installs the stderr subscriber. `RUST_LOG` takes precedence over `verbosity`.
pub fn init_tracing(verbosity: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| verbosity_filter(verbosity).into());
    // a subscriber may already be installed when run repeatedly in-process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = CapweightError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn apply_overrides(adapter: &mut FileConfigAdapter, overrides: &Overrides) {
    if let Some(v) = &overrides.start_date {
        adapter.set("backtest", "start_date", v.as_str());
    }
    if let Some(v) = &overrides.end_date {
        adapter.set("backtest", "end_date", v.as_str());
    }
    if let Some(v) = &overrides.data_dir {
        adapter.set("backtest", "data_dir", v.display().to_string());
    }
    if let Some(v) = overrides.initial_capital {
        adapter.set("backtest", "initial_capital", v.to_string());
    }
    if let Some(v) = &overrides.basket_sizes {
        adapter.set("strategy", "basket_sizes", v.as_str());
    }
    if let Some(v) = &overrides.weight_caps {
        adapter.set("strategy", "weight_caps", v.as_str());
    }
    if let Some(v) = &overrides.rebalance_periods {
        adapter.set("strategy", "rebalance_periods", v.as_str());
    }
    if let Some(v) = overrides.fee {
        adapter.set("strategy", "transaction_fee", v.to_string());
    }
    if overrides.json {
        adapter.set("output", "json", "true");
    }
    if let Some(v) = &overrides.output_dir {
        adapter.set("output", "dir", v.display().to_string());
    }
}

/// Loads, overrides and validates the configuration.
pub fn resolve_config(path: &Path, overrides: &Overrides) -> Result<FileConfigAdapter, ExitCode> {
    eprintln!("Loading config from {}", path.display());
    let mut adapter = load_config(path)?;
    apply_overrides(&mut adapter, overrides);

    if let Err(e) = validate_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return Err((&e).into());
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        eprintln!("error: {e}");
        return Err((&e).into());
    }
    Ok(adapter)
}

pub fn build_run_config(adapter: &dyn ConfigPort) -> Result<RunConfig, CapweightError> {
    let start_date = parse_date(adapter.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(adapter.get_string("backtest", "end_date").as_deref(), "end_date")?;

    let max_rows = adapter.get_int("backtest", "max_rows", DEFAULT_MAX_ROWS as i64);
    let max_rows = usize::try_from(max_rows).map_err(|_| CapweightError::ConfigInvalid {
        section: "backtest".into(),
        key: "max_rows".into(),
        reason: "max_rows must be at least 1".into(),
    })?;

    Ok(RunConfig {
        start_date,
        end_date,
        initial_capital: adapter.get_double("backtest", "initial_capital", 0.0),
        base_currency: adapter
            .get_string("backtest", "base_currency")
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_CURRENCY.to_string()),
        max_rows,
    })
}

pub fn build_sweep_grid(adapter: &dyn ConfigPort) -> Result<SweepGrid, CapweightError> {
    Ok(SweepGrid {
        basket_sizes: strategy_list(adapter, "basket_sizes", None)?,
        weight_caps: strategy_list(adapter, "weight_caps", Some(DEFAULT_WEIGHT_CAPS))?,
        rebalance_periods: strategy_list(
            adapter,
            "rebalance_periods",
            Some(DEFAULT_REBALANCE_PERIODS),
        )?,
        transaction_fee: adapter.get_double("strategy", "transaction_fee", 0.0),
    })
}

pub fn build_output_settings(adapter: &dyn ConfigPort) -> OutputSettings {
    let data_dir = adapter
        .get_string("backtest", "data_dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let output_dir = adapter
        .get_string("output", "dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.clone());
    OutputSettings {
        data_dir,
        output_dir,
        json: adapter.get_bool("output", "json", false),
    }
}

fn run_backtest(config_path: &Path, overrides: &Overrides) -> ExitCode {
    // Stage 1: Load, override and validate config
    let adapter = match resolve_config(config_path, overrides) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Build run parameters and grid
    let run = match build_run_config(&adapter) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let grid = match build_sweep_grid(&adapter) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let output = build_output_settings(&adapter);

    // Stage 3: Wire adapters and run
    let snapshots = CsvSnapshotAdapter::new(output.data_dir.clone());
    let reporter = FileReportAdapter::new(output.output_dir.clone());
    run_backtest_pipeline(&snapshots, &reporter, &grid, &run, output.json)
}

/// Runs the sweep, writes every result and prints the console summary.
pub fn run_backtest_pipeline(
    snapshots: &dyn SnapshotPort,
    reporter: &dyn ReportPort,
    grid: &SweepGrid,
    run: &RunConfig,
    json: bool,
) -> ExitCode {
    eprintln!(
        "Running {} strategies: {} to {}, {:.0} USD, base {}",
        grid.len(),
        run.start_date,
        run.end_date,
        run.initial_capital,
        run.base_currency
    );

    let report = run_sweep(snapshots, grid, run);

    for (strategy, series) in report.completed() {
        if let Err(e) = reporter.write_series(series, strategy, run) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        if let Err(e) = reporter.write_transactions(series, strategy, run) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        if json {
            if let Err(e) = reporter.write_equity_json(series, strategy, run) {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    let summaries = report.summaries();
    let summary_path = match reporter.write_summary(&summaries, run, grid.transaction_fee) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if json {
        if let Err(e) = reporter.write_summary_json(&summaries, run, grid.transaction_fee) {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    print_summary(&report, &summaries);
    eprintln!("\nSummary written to: {}", summary_path.display());

    match report.failures().next() {
        Some((_, err)) => {
            let err = CapweightError::from(err.clone());
            ExitCode::from(&err)
        }
        None => ExitCode::SUCCESS,
    }
}

fn format_option(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

fn print_summary(report: &SweepReport, summaries: &[StrategySummary]) {
    eprintln!("\n=== Strategy Results ===");
    for s in summaries {
        eprintln!("  {}", s.strategy);
        eprintln!(
            "    ROI:          {:+.2}% USD, {:+.2}% BTC",
            s.roi_pct.usd, s.roi_pct.btc
        );
        eprintln!("    Max Drawdown: {:.1}%", s.max_drawdown_pct);
        eprintln!(
            "    Sharpe:       {} USD, {} BTC",
            format_option(s.sharpe_usd),
            format_option(s.sharpe_btc)
        );
        eprintln!(
            "    Transactions: {} ({:.2} USD in fees)",
            s.total_transactions, s.total_fees.usd
        );
        if s.missing_weeks > 0 {
            eprintln!("    Missing:      {} weeks", s.missing_weeks);
        }
    }

    let infeasible: Vec<_> = report.infeasible().collect();
    if !infeasible.is_empty() {
        eprintln!("\n=== Skipped (basket x cap < 1) ===");
        for s in infeasible {
            eprintln!("  {}", s);
        }
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        eprintln!("\n=== Failed ===");
        for (s, err) in failures {
            eprintln!("  {}: {}", s, err);
        }
    }
}

fn run_validate(config_path: &Path, overrides: &Overrides) -> ExitCode {
    let adapter = match resolve_config(config_path, overrides) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let (run, grid) = match build_run_config(&adapter).and_then(|r| Ok((r, build_sweep_grid(&adapter)?))) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let output = build_output_settings(&adapter);

    eprintln!("\nRun:");
    eprintln!("  dates:           {} to {}", run.start_date, run.end_date);
    eprintln!("  initial capital: {:.2} USD", run.initial_capital);
    eprintln!("  base currency:   {}", run.base_currency);
    eprintln!("  max rows:        {}", run.max_rows);
    eprintln!("  data dir:        {}", output.data_dir.display());
    eprintln!("  output dir:      {}", output.output_dir.display());

    eprintln!("\nGrid ({} combinations):", grid.len());
    let strategies = grid.strategies();
    for s in &strategies {
        let note = if s.is_feasible() { "" } else { " [infeasible, skipped]" };
        eprintln!("  {}{}", s, note);
    }
    let feasible = strategies.iter().filter(|s| s.is_feasible()).count();

    eprintln!("\nConfiguration is valid: {} of {} strategies will run.", feasible, grid.len());
    ExitCode::SUCCESS
}
