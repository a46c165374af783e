use crate::error::EngineError;
use crate::models::{BacktestReport, BacktestStep, BandParameters, PriceSeries, SignalAction};
use crate::performance::PerformanceCalculator;
use crate::strategy::{BollingerStrategy, Strategy};
use log::debug;

/// Simulated holdings: cash and a whole number of shares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub shares: u64,
}

impl Portfolio {
    pub fn new(cash: f64) -> Self {
        Self { cash, shares: 0 }
    }

    pub fn value(&self, price: f64) -> f64 {
        self.shares as f64 * price + self.cash
    }

    /// Applies `signal` at `price` and returns the action actually executed. A buy
    /// without enough cash or a sell without a share is downgraded to `Hold`.
    pub fn apply(&mut self, signal: SignalAction, price: f64) -> SignalAction {
        match signal {
            SignalAction::Buy if self.cash >= price => {
                self.shares += 1;
                self.cash -= price;
                SignalAction::Buy
            }
            SignalAction::Sell if self.shares >= 1 => {
                self.shares -= 1;
                self.cash += price;
                SignalAction::Sell
            }
            _ => SignalAction::Hold,
        }
    }
}

pub struct Backtester<'a> {
    strategy: &'a (dyn Strategy + Send + Sync),
}

impl<'a> Backtester<'a> {
    pub fn new(strategy: &'a (dyn Strategy + Send + Sync)) -> Self {
        Self { strategy }
    }

    /// Walks the series from the strategy lookback to the end. The decision for step `i`
    /// sees only `closes[..i]` and is executed at `closes[i]`.
    pub fn run(&self, series: &PriceSeries) -> Result<BacktestReport, EngineError> {
        series.validate()?;
        let prices = series.closes();
        let parameters = self.strategy.parameters();

        let Some(starting_price) = series.first() else {
            return Ok(BacktestReport {
                parameters,
                steps: Vec::new(),
                performance: PerformanceCalculator::calculate_performance(prices, &[], 0),
            });
        };

        let starting_portfolio = Portfolio::new(starting_price);
        let mut portfolio = starting_portfolio;
        let start = self.strategy.lookback().max(1);
        let mut steps = Vec::with_capacity(prices.len().saturating_sub(start));
        let mut dropped_signals = 0;

        for i in start..prices.len() {
            let price = prices[i];
            let proposed = self.strategy.generate_signal(&prices[..i]);
            let executed = portfolio.apply(proposed, price);
            if executed != proposed {
                dropped_signals += 1;
                debug!(
                    "Dropped {} at index {} (price {:.4}, cash {:.4}, shares {})",
                    proposed, i, price, portfolio.cash, portfolio.shares
                );
            }

            let baseline = starting_portfolio.value(price);
            let net = (portfolio.value(price) - baseline) / baseline;

            steps.push(BacktestStep {
                index: i,
                date: series.date(i),
                price,
                signal: executed,
                net,
                cash: portfolio.cash,
                shares: portfolio.shares,
            });
        }

        let performance =
            PerformanceCalculator::calculate_performance(prices, &steps, dropped_signals);
        debug!(
            "Backtest {} finished: {} steps, net {:.4}, trades {}",
            parameters,
            steps.len(),
            performance.final_net,
            performance.total_trades
        );

        Ok(BacktestReport {
            parameters,
            steps,
            performance,
        })
    }
}

/// Backtests the band rule with `parameters` over `series`.
pub fn backtest(
    series: &PriceSeries,
    parameters: BandParameters,
) -> Result<BacktestReport, EngineError> {
    let strategy = BollingerStrategy::new(parameters)?;
    Backtester::new(&strategy).run(series)
}
