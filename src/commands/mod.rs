pub mod backtest;
pub mod optimize;
pub mod signal;
