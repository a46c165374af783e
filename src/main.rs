use anyhow::Result;
use bandtrader::{
    commands::{backtest, optimize, signal},
    config::EngineSettings,
    models::{BandParameters, ParameterRange},
    param_utils::parse_range,
};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "bandtrader")]
#[command(about = "Backtest and tune a band-crossing mean-reversion rule")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate the rule over a price file and print the net return
    Backtest {
        /// JSON price file (array of closes or of {date, close} bars)
        #[arg(long = "data-file", value_name = "PATH")]
        data_file: PathBuf,
        /// Trailing window length (defaults to BAND_WINDOW or 5)
        #[arg(long)]
        window: Option<usize>,
        /// Band width in standard deviations (defaults to BAND_SIGMA or 1.78)
        #[arg(long)]
        sigma: Option<f64>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Grid search over window and sigma ranges
    Optimize {
        /// JSON price file (array of closes or of {date, close} bars)
        #[arg(long = "data-file", value_name = "PATH")]
        data_file: PathBuf,
        /// Window range as min,max,step
        #[arg(long)]
        windows: Option<String>,
        /// Sigma range as min,max,step
        #[arg(long)]
        sigmas: Option<String>,
        /// Worker threads (defaults to OPTIMIZER_WORKERS or the CPU count)
        #[arg(long)]
        workers: Option<usize>,
        /// Give up on cells not started after this many seconds
        #[arg(long = "deadline-secs")]
        deadline_secs: Option<u64>,
        /// Suppress progress output
        #[arg(long)]
        quiet: bool,
    },
    /// Print the decision for the last bar of a price file
    Signal {
        /// JSON price file (array of closes or of {date, close} bars)
        #[arg(long = "data-file", value_name = "PATH")]
        data_file: PathBuf,
        #[arg(long)]
        window: Option<usize>,
        #[arg(long)]
        sigma: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = EngineSettings::from_env()?;
    info!("Starting bandtrader. Not financial advice. Use at your own risk.");

    match cli.command {
        Commands::Backtest {
            data_file,
            window,
            sigma,
            json,
        } => {
            let parameters = resolve_band(&settings, window, sigma)?;
            backtest::run(&data_file, parameters, json)?;
        }
        Commands::Optimize {
            data_file,
            windows,
            sigmas,
            workers,
            deadline_secs,
            quiet,
        } => {
            let request = optimize::OptimizeRequest {
                data_file: &data_file,
                window_range: resolve_range(windows.as_deref(), settings.window_range)?,
                sigma_range: resolve_range(sigmas.as_deref(), settings.sigma_range)?,
                workers: workers.unwrap_or(settings.workers).max(1),
                deadline: deadline_secs.map(Duration::from_secs),
                verbose: !quiet,
            };
            optimize::run(&settings, request)?;
        }
        Commands::Signal {
            data_file,
            window,
            sigma,
        } => {
            let parameters = resolve_band(&settings, window, sigma)?;
            signal::run(&data_file, parameters)?;
        }
    }

    Ok(())
}

fn resolve_band(
    settings: &EngineSettings,
    window: Option<usize>,
    sigma: Option<f64>,
) -> Result<BandParameters> {
    let parameters = BandParameters::new(
        window.unwrap_or(settings.band.window),
        sigma.unwrap_or(settings.band.sigma),
    )?;
    Ok(parameters)
}

fn resolve_range(cli_value: Option<&str>, fallback: ParameterRange) -> Result<ParameterRange> {
    match cli_value {
        Some(raw) => Ok(parse_range(raw)?),
        None => Ok(fallback),
    }
}
