//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::interval_indexer::IntervalIndexer;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig};
use crate::domain::candlestick::{to_datetime, Candlestick};
use crate::domain::config_validation::{
    build_backtest_config, parse_sweep_axes, validate_backtest_config, SWEEP,
};
use crate::domain::error::PlutusError;
use crate::domain::performance::Performance;
use crate::domain::sweep::{self, SweepParameter, SweepResult};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, FeatureFrame};

#[derive(Parser, Debug)]
#[command(name = "plutus", about = "Prediction-driven trade simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        candles: PathBuf,
        #[arg(long)]
        features: PathBuf,
        /// Minutes covered by each feature row
        #[arg(long, default_value_t = 1)]
        interval_minutes: i64,
        /// List every closed position
        #[arg(long)]
        positions: bool,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Run one backtest per combination of the [sweep] values
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        candles: PathBuf,
        #[arg(long)]
        features: PathBuf,
        #[arg(long, default_value_t = 1)]
        interval_minutes: i64,
        /// Number of results to print
        #[arg(long, default_value_t = 10)]
        top: usize,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            candles,
            features,
            interval_minutes,
            positions,
            verbose,
        } => {
            init_logging(verbose);
            run_backtest(&config, CsvAdapter::new(candles, features), interval_minutes, positions)
        }
        Command::Sweep {
            config,
            candles,
            features,
            interval_minutes,
            top,
            verbose,
        } => {
            init_logging(verbose);
            run_sweep(&config, CsvAdapter::new(candles, features), interval_minutes, top)
        }
        Command::Validate { config } => run_validate(&config),
    }
}

/// Installs the stderr subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "plutus=debug" } else { "plutus=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second call in the same process keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr).compact())
        .with(filter)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_backtest(
    config_path: &Path,
    data_port: CsvAdapter,
    interval_minutes: i64,
    show_positions: bool,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match execute_backtest(&data_port, &adapter, interval_minutes) {
        Ok(performance) => {
            print_summary(&performance);
            if show_positions {
                print_positions(&performance);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_sweep(config_path: &Path, data_port: CsvAdapter, interval_minutes: i64, top: usize) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match execute_sweep(&data_port, &adapter, interval_minutes) {
        Ok(results) => {
            print_sweep(&results, top);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let has_sweep = SweepParameter::ALL
        .iter()
        .any(|p| adapter.has_key(SWEEP, p.key()));
    if has_sweep {
        if let Err(e) = parse_sweep_axes(&adapter) {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    eprintln!("Configuration is valid.");
    ExitCode::SUCCESS
}

/// Everything a run reads, loaded once.
pub struct RunInputs {
    pub config: BacktestConfig,
    pub candlesticks: Vec<Candlestick>,
    pub frame: FeatureFrame,
    pub indexer: IntervalIndexer,
}

pub fn load_inputs(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    interval_minutes: i64,
) -> Result<RunInputs, PlutusError> {
    validate_backtest_config(config)?;

    let candlesticks = data_port.fetch_candlesticks()?;
    let first = candlesticks.first().ok_or_else(|| PlutusError::Data {
        reason: "no candlesticks to simulate".into(),
    })?;
    let frame = data_port.fetch_features()?;
    info!(
        candlesticks = candlesticks.len(),
        feature_rows = frame.len(),
        "loaded data"
    );

    let indexer = IntervalIndexer::new(first.open_time, interval_minutes);
    let backtest_config = build_backtest_config(config, frame.len())?;

    Ok(RunInputs {
        config: backtest_config,
        candlesticks,
        frame,
        indexer,
    })
}

pub fn execute_backtest(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    interval_minutes: i64,
) -> Result<Performance, PlutusError> {
    let inputs = load_inputs(data_port, config, interval_minutes)?;
    let performance = backtest_engine::run(
        &inputs.config,
        &inputs.candlesticks,
        &inputs.frame.features,
        &inputs.frame.features_sum,
        &inputs.indexer,
    )?;
    Ok(performance)
}

pub fn execute_sweep(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    interval_minutes: i64,
) -> Result<Vec<SweepResult>, PlutusError> {
    let axes = parse_sweep_axes(config)?;
    let inputs = load_inputs(data_port, config, interval_minutes)?;
    let results = sweep::run_sweep(
        &inputs.config,
        &axes,
        &inputs.candlesticks,
        &inputs.frame.features,
        &inputs.frame.features_sum,
        &inputs.indexer,
    )?;
    Ok(results)
}

fn format_time(timestamp_ms: i64) -> String {
    to_datetime(timestamp_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn print_summary(p: &Performance) {
    eprintln!("\n=== Backtest Results ===");
    eprintln!("Initial Balance:  {:.2}", p.initial_balance);
    eprintln!("Final Balance:    {:.2}", p.final_balance);
    eprintln!("Profit:           {:.2}", p.profit);
    eprintln!("Fees:             {:.2}", p.fees);
    eprintln!(
        "Positions:        {} ({} long, {} short)",
        p.position_count(),
        p.long_count,
        p.short_count
    );
    eprintln!("Accuracy:         {:.2}%", p.accuracy);
    eprintln!("Long Accuracy:    {:.2}%", p.long_accuracy);
    eprintln!("Short Accuracy:   {:.2}%", p.short_accuracy);
    eprintln!(
        "Outcomes:         {} up, {} down",
        p.increase_outcome_count, p.decrease_outcome_count
    );
    eprintln!("Max Drawdown:     {:.2}%", p.largest_balance_drawdown);
    eprintln!("Points:           {:.2} (median {:.2})", p.points, p.points_median);
    eprintln!("Stopped:          {}", p.termination);
}

fn print_positions(p: &Performance) {
    eprintln!("\n=== Positions ===");
    for pos in &p.positions {
        eprintln!(
            "  {} -> {}  {:?} ({:+}) {:.2} -> {:.2}  {}  balance {:.2}",
            format_time(pos.open_time()),
            format_time(pos.close_time),
            pos.position_type(),
            pos.position.prediction.result.as_i8(),
            pos.position.open_price,
            pos.close_price,
            if pos.outcome { "TP" } else { "SL" },
            pos.balance_after,
        );
    }
}

fn print_sweep(results: &[SweepResult], top: usize) {
    eprintln!("\n=== Sweep Results ({} runs) ===", results.len());
    for r in results.iter().take(top) {
        let overrides: Vec<String> = r
            .overrides
            .iter()
            .map(|(parameter, value)| format!("{parameter}={value}"))
            .collect();
        let pnl_sign = if r.performance.is_profitable() { "+" } else { "" };
        eprintln!(
            "  {}  {}  {} positions, {:.1}% accuracy, {}{:.2}",
            r.config_id,
            overrides.join(" "),
            r.performance.position_count(),
            r.performance.accuracy,
            pnl_sign,
            r.performance.profit,
        );
    }
}
