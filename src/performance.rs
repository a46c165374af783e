use crate::models::{BacktestStep, SignalAction};
use serde::{Deserialize, Serialize};

/// Summary statistics of one backtest run. Returns are ratios (0.05 = 5%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestPerformance {
    pub final_net: f64,
    pub buy_and_hold_return: f64,
    pub total_trades: usize,
    pub buy_trades: usize,
    pub sell_trades: usize,
    pub dropped_signals: usize,
    pub best_net: f64,
    pub worst_net: f64,
}

pub struct PerformanceCalculator;

impl PerformanceCalculator {
    pub fn calculate_performance(
        prices: &[f64],
        steps: &[BacktestStep],
        dropped_signals: usize,
    ) -> BacktestPerformance {
        let buy_trades = count_signals(steps, SignalAction::Buy);
        let sell_trades = count_signals(steps, SignalAction::Sell);

        let final_net = steps.last().map(|s| s.net).unwrap_or(0.0);
        let (best_net, worst_net) = if steps.is_empty() {
            (0.0, 0.0)
        } else {
            steps.iter().fold((f64::MIN, f64::MAX), |(best, worst), step| {
                (best.max(step.net), worst.min(step.net))
            })
        };

        BacktestPerformance {
            final_net,
            buy_and_hold_return: buy_and_hold_return(prices),
            total_trades: buy_trades + sell_trades,
            buy_trades,
            sell_trades,
            dropped_signals,
            best_net,
            worst_net,
        }
    }
}

/// `(last - first) / first`, or 0 for fewer than two prices.
pub fn buy_and_hold_return(prices: &[f64]) -> f64 {
    match (prices.first(), prices.last()) {
        (Some(&first), Some(&last)) if prices.len() > 1 && first != 0.0 => (last - first) / first,
        _ => 0.0,
    }
}

fn count_signals(steps: &[BacktestStep], action: SignalAction) -> usize {
    steps.iter().filter(|step| step.signal == action).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(index: usize, signal: SignalAction, net: f64) -> BacktestStep {
        BacktestStep {
            index,
            date: None,
            price: 100.0,
            signal,
            net,
            cash: 100.0,
            shares: 0,
        }
    }

    #[test]
    fn counts_executed_trades_and_tracks_extremes() {
        let steps = vec![
            step(3, SignalAction::Hold, 0.0),
            step(4, SignalAction::Buy, -0.02),
            step(5, SignalAction::Hold, 0.07),
            step(6, SignalAction::Sell, 0.05),
        ];
        let performance =
            PerformanceCalculator::calculate_performance(&[100.0, 110.0], &steps, 3);

        assert_eq!(performance.total_trades, 2);
        assert_eq!(performance.buy_trades, 1);
        assert_eq!(performance.sell_trades, 1);
        assert_eq!(performance.dropped_signals, 3);
        assert!((performance.final_net - 0.05).abs() < 1e-12);
        assert!((performance.best_net - 0.07).abs() < 1e-12);
        assert!((performance.worst_net + 0.02).abs() < 1e-12);
        assert!((performance.buy_and_hold_return - 0.10).abs() < 1e-12);
    }

    #[test]
    fn empty_run_is_flat() {
        let performance = PerformanceCalculator::calculate_performance(&[100.0], &[], 0);
        assert_eq!(performance, BacktestPerformance::default());
        assert_eq!(buy_and_hold_return(&[]), 0.0);
    }
}
