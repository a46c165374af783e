use crate::config::EngineSettings;
use crate::data_context::load_price_series;
use crate::models::{BandParameters, ParameterRange};
use crate::optimizer::{OptimizationOutcome, OptimizerOptions, ParameterOptimizer};
use anyhow::Result;
use log::{info, warn};
use std::path::Path;
use std::time::Duration;

pub struct OptimizeRequest<'a> {
    pub data_file: &'a Path,
    pub window_range: ParameterRange,
    pub sigma_range: ParameterRange,
    pub workers: usize,
    pub deadline: Option<Duration>,
    pub verbose: bool,
}

pub fn run(settings: &EngineSettings, request: OptimizeRequest<'_>) -> Result<OptimizationOutcome> {
    info!(
        "Received optimize command for {} (windows {:?}, sigmas {:?})",
        request.data_file.display(),
        request.window_range,
        request.sigma_range
    );
    let series = load_price_series(request.data_file)?;
    let optimizer = ParameterOptimizer::new(
        &series,
        OptimizerOptions {
            workers: request.workers,
            sigma_precision: settings.sigma_precision,
            verbose: request.verbose,
            deadline: request.deadline,
        },
    );
    let outcome = optimizer.optimize(&request.window_range, &request.sigma_range)?;

    match &outcome.best {
        Some(best) => {
            println!("--");
            println!(
                "best: {:.2}%, best params: {} (b&h: {:.2}%)",
                best.net_return * 100.0,
                best.parameters,
                outcome.buy_and_hold_return * 100.0
            );
            println!(
                "  Cells evaluated: {}  Duplicates skipped: {}  Expired: {}  Failed: {}",
                outcome.evaluated, outcome.duplicates_skipped, outcome.expired, outcome.failed
            );
            println!("{}", band_settings(&best.parameters));
        }
        None => warn!("No parameter pair could be evaluated."),
    }

    Ok(outcome)
}

/// The winning pair as `KEY=value` lines read back by `EngineSettings`, so the result can
/// be exported into the environment of a later `backtest` or `signal` run.
pub fn band_settings(parameters: &BandParameters) -> String {
    format!(
        "BAND_WINDOW={}\nBAND_SIGMA={}",
        parameters.window, parameters.sigma
    )
}
