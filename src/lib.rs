pub mod backtester;
pub mod commands;
pub mod config;
pub mod data_context;
pub mod error;
pub mod indicators;
pub mod models;
pub mod optimizer;
pub mod optimizer_status;
pub mod param_utils;
pub mod performance;
pub mod signals;
pub mod strategy;
pub mod trader;

pub use backtester::{backtest, Backtester, Portfolio};
pub use error::EngineError;
pub use models::{BacktestReport, Band, BandParameters, ParameterRange, PriceSeries, SignalAction};
pub use optimizer::{OptimizationOutcome, OptimizerOptions, ParameterOptimizer};
