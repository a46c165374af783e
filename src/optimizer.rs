use crate::backtester::backtest;
use crate::error::EngineError;
use crate::models::{
    BacktestTask, BacktestTaskResult, BandParameters, ParameterRange, ParameterResult,
    PriceSeries,
};
use crate::optimizer_status::OptimizerStatus;
use crate::param_utils::{
    build_grid, normalize_sigma, parameter_signature, sigma_candidates, window_candidates,
    DEFAULT_SIGMA_PRECISION,
};
use crate::performance::buy_and_hold_return;
use crossbeam_channel::{bounded, Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct OptimizerOptions {
    pub workers: usize,
    pub sigma_precision: u32,
    /// Progress bar and a log line for every improvement of the best score.
    pub verbose: bool,
    /// Cells not started before this much time has elapsed are skipped.
    pub deadline: Option<Duration>,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            workers: std::cmp::max(1, num_cpus::get()),
            sigma_precision: DEFAULT_SIGMA_PRECISION,
            verbose: false,
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OptimizationOutcome {
    pub best: Option<ParameterResult>,
    /// Evaluated cells in grid order.
    pub results: Vec<ParameterResult>,
    pub evaluated: usize,
    pub duplicates_skipped: usize,
    pub expired: usize,
    pub failed: usize,
    pub buy_and_hold_return: f64,
}

/// Exhaustive search over (window, sigma) pairs.
///
/// Cells run on a bounded pool of worker threads sharing the read-only series. Results
/// are reduced on the calling thread in grid order with a strict `>` comparison, so the
/// earliest cell wins ties regardless of which worker finished first.
pub struct ParameterOptimizer<'a> {
    series: &'a PriceSeries,
    options: OptimizerOptions,
    status: OptimizerStatus,
}

impl<'a> ParameterOptimizer<'a> {
    pub fn new(series: &'a PriceSeries, options: OptimizerOptions) -> Self {
        Self {
            series,
            options,
            status: OptimizerStatus::new(),
        }
    }

    pub fn with_status(mut self, status: OptimizerStatus) -> Self {
        self.status = status;
        self
    }

    fn objective_score(result: &ParameterResult) -> f64 {
        if result.net_return.is_finite() {
            result.net_return
        } else {
            f64::NEG_INFINITY
        }
    }

    pub fn optimize(
        &self,
        window_range: &ParameterRange,
        sigma_range: &ParameterRange,
    ) -> Result<OptimizationOutcome, EngineError> {
        let windows = window_candidates(window_range)?;
        let sigmas = sigma_candidates(sigma_range, self.options.sigma_precision)?;
        self.optimize_grid(&build_grid(&windows, &sigmas))
    }

    /// Evaluates `candidates` in order, skipping pairs whose normalized key was already seen.
    pub fn optimize_grid(
        &self,
        candidates: &[BandParameters],
    ) -> Result<OptimizationOutcome, EngineError> {
        self.series.validate()?;
        let precision = self.options.sigma_precision;

        let mut seen_variations = HashSet::new();
        let mut tasks = Vec::with_capacity(candidates.len());
        let mut duplicates_skipped = 0;
        for candidate in candidates {
            let parameters = BandParameters::new(
                candidate.window,
                normalize_sigma(candidate.sigma, precision),
            )?;
            if seen_variations.insert(parameter_signature(&parameters, precision)) {
                tasks.push(BacktestTask {
                    id: tasks.len(),
                    parameters,
                });
            } else {
                duplicates_skipped += 1;
            }
        }
        if duplicates_skipped > 0 {
            info!("Skipped {} duplicate parameter pair(s).", duplicates_skipped);
        }

        let buy_and_hold = buy_and_hold_return(self.series.closes());
        let mut outcome = OptimizationOutcome {
            duplicates_skipped,
            buy_and_hold_return: buy_and_hold,
            ..Default::default()
        };
        if tasks.is_empty() {
            warn!("Parameter grid is empty; nothing to optimize.");
            self.status.set_phase("Finished");
            return Ok(outcome);
        }

        self.status.set_phase("Evaluating grid");
        let task_results = self.run_parallel_backtests(&tasks);

        let mut ordered: Vec<Option<BacktestTaskResult>> = vec![None; tasks.len()];
        for task_result in task_results {
            if let Some(slot) = ordered.get_mut(task_result.task_id) {
                *slot = Some(task_result);
            }
        }

        let mut best_score = f64::NEG_INFINITY;
        for task_result in ordered.into_iter().flatten() {
            if task_result.expired {
                outcome.expired += 1;
                continue;
            }
            let Some(result) = task_result.result else {
                outcome.failed += 1;
                if let Some(error) = task_result.error {
                    warn!("Task {} failed: {}", task_result.task_id, error);
                }
                continue;
            };

            outcome.evaluated += 1;
            let score = Self::objective_score(&result);
            if outcome.best.is_none() || score > best_score {
                best_score = score;
                self.status.set_best(result.parameters, result.net_return);
                if self.options.verbose {
                    info!(
                        "best: {:.2}%, best params: {} (b&h: {:.2}%)",
                        result.net_return * 100.0,
                        result.parameters,
                        buy_and_hold * 100.0
                    );
                }
                outcome.best = Some(result.clone());
            }
            outcome.results.push(result);
        }

        if outcome.expired > 0 {
            warn!(
                "Deadline reached: {} of {} cell(s) were not evaluated.",
                outcome.expired,
                tasks.len()
            );
        }
        match &outcome.best {
            Some(best) => info!(
                "Optimization finished. Best net {:.2}% with {} over {} cell(s) (b&h: {:.2}%).",
                best.net_return * 100.0,
                best.parameters,
                outcome.evaluated,
                buy_and_hold * 100.0
            ),
            None => warn!("Optimization finished without any evaluated cell."),
        }
        self.status.set_phase("Finished");

        Ok(outcome)
    }

    fn run_parallel_backtests(&self, tasks: &[BacktestTask]) -> Vec<BacktestTaskResult> {
        let task_count = tasks.len();
        let num_workers = std::cmp::min(task_count, std::cmp::max(1, self.options.workers));
        info!("Running {} backtests...", task_count);
        info!("Using {} worker threads", num_workers);

        let (tx, rx): (Sender<BacktestTask>, Receiver<BacktestTask>) = bounded(task_count);
        let (result_tx, result_rx): (Sender<BacktestTaskResult>, Receiver<BacktestTaskResult>) =
            bounded(task_count);

        let pb = if self.options.verbose {
            ProgressBar::new(task_count as u64)
        } else {
            ProgressBar::hidden()
        };
        match ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            Ok(style) => pb.set_style(style.progress_chars("#>-")),
            Err(err) => warn!("Progress bar style rejected: {}", err),
        }

        let series = self.series;
        let deadline = self.options.deadline;
        let started = Instant::now();
        let mut results = Vec::with_capacity(task_count);
        let mut failed = 0;

        thread::scope(|scope| {
            for _worker_id in 0..num_workers {
                let rx = rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    while let Ok(task) = rx.recv() {
                        let result = Self::run_single_backtest(series, &task, started, deadline);
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for task in tasks {
                if tx.send(task.clone()).is_err() {
                    warn!("Task channel closed unexpectedly. Some cells will be missing.");
                    break;
                }
            }
            drop(tx);

            for result in result_rx.iter() {
                if result.result.is_none() {
                    failed += 1;
                }
                results.push(result);
                pb.set_position(results.len() as u64);
                self.status.set_progress(task_count, results.len(), failed);
            }
        });

        if results.len() < task_count {
            warn!("Result channel closed unexpectedly. Some results may be lost.");
        }
        if failed > 0 {
            pb.finish_with_message("Backtesting completed with skipped or failed cells");
        } else {
            pb.finish_with_message("Backtesting completed");
        }

        results
    }

    fn run_single_backtest(
        series: &PriceSeries,
        task: &BacktestTask,
        started: Instant,
        deadline: Option<Duration>,
    ) -> BacktestTaskResult {
        if deadline.is_some_and(|limit| started.elapsed() >= limit) {
            return BacktestTaskResult {
                task_id: task.id,
                result: None,
                expired: true,
                error: None,
            };
        }

        match backtest(series, task.parameters) {
            Ok(report) => BacktestTaskResult {
                task_id: task.id,
                result: Some(ParameterResult {
                    parameters: task.parameters,
                    net_return: report.final_net(),
                    total_trades: report.performance.total_trades,
                }),
                expired: false,
                error: None,
            },
            Err(err) => BacktestTaskResult {
                task_id: task.id,
                result: None,
                expired: false,
                error: Some(err.to_string()),
            },
        }
    }
}
