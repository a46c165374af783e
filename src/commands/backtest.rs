use crate::backtester::backtest;
use crate::data_context::load_price_series;
use crate::models::{BacktestReport, BandParameters};
use anyhow::Result;
use log::info;
use std::path::Path;

pub fn run(data_file: &Path, parameters: BandParameters, json: bool) -> Result<BacktestReport> {
    info!(
        "Received backtest command for {} using {}",
        parameters,
        data_file.display()
    );
    let series = load_price_series(data_file)?;
    let report = backtest(&series, parameters)?;

    if report.is_empty() {
        info!(
            "Series of {} price(s) is too short for window {}; nothing was simulated.",
            series.len(),
            parameters.window
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report)
}

fn print_report(report: &BacktestReport) {
    let performance = &report.performance;
    println!(
        "Net: {:.2}% {} (b&h: {:.2}%) (# of trades: {})",
        performance.final_net * 100.0,
        report.parameters,
        performance.buy_and_hold_return * 100.0,
        performance.total_trades
    );
    println!(
        "  Buys: {}  Sells: {}  Dropped signals: {}",
        performance.buy_trades, performance.sell_trades, performance.dropped_signals
    );
    println!(
        "  Best net: {:.2}%  Worst net: {:.2}%",
        performance.best_net * 100.0,
        performance.worst_net * 100.0
    );
}
