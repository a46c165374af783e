//! One live trading decision: fetch recent closes, ask the strategy, and act through a
//! broker account only when the account can honour the order.
//!
//! The brokerage client and the polling cadence live outside this crate; they plug in
//! through [`PriceFeed`] and [`BrokerAccount`].

use crate::models::{PriceSeries, SignalAction};
use crate::strategy::Strategy;
use log::{info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Price feed request failed: {0}")]
    Request(String),
    #[error("No bars returned for {0}")]
    Empty(String),
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Broker API request failed: {0}")]
    ApiError(String),
    #[error("Order rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum TraderError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

pub trait PriceFeed {
    fn latest_closes(&self, ticker: &str) -> Result<PriceSeries, FeedError>;
}

pub trait BrokerAccount {
    fn buying_power(&self) -> Result<f64, BrokerError>;
    fn shares(&self, ticker: &str) -> Result<u64, BrokerError>;
    fn has_open_orders(&self) -> Result<bool, BrokerError>;
    fn submit_limit_order(
        &self,
        ticker: &str,
        side: SignalAction,
        price: f64,
        quantity: u64,
    ) -> Result<(), BrokerError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub ticker: String,
    pub side: SignalAction,
    pub price: f64,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    Submitted(OrderRequest),
    Held,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    OpenOrders,
    InsufficientBuyingPower { available: f64, required: f64 },
    InsufficientShares { held: u64, required: u64 },
    ZeroQuantity,
}

pub struct Trader<'a, F: PriceFeed, B: BrokerAccount> {
    feed: &'a F,
    broker: &'a B,
    strategy: &'a (dyn Strategy + Send + Sync),
    spend_amount: f64,
}

impl<'a, F: PriceFeed, B: BrokerAccount> Trader<'a, F, B> {
    pub fn new(
        feed: &'a F,
        broker: &'a B,
        strategy: &'a (dyn Strategy + Send + Sync),
        spend_amount: f64,
    ) -> Self {
        Self {
            feed,
            broker,
            strategy,
            spend_amount,
        }
    }

    /// Runs one decision for `ticker`. Orders are sized as `floor(spend_amount / price)`
    /// whole shares at the last close.
    pub fn decide_and_act(&self, ticker: &str) -> Result<TradeOutcome, TraderError> {
        let series = self.feed.latest_closes(ticker)?;
        let Some(price) = series.last() else {
            return Err(FeedError::Empty(ticker.to_string()).into());
        };
        if series.len() < self.strategy.get_min_data_points() {
            warn!(
                "Only {} bar(s) for {}; {} needs {} to signal",
                series.len(),
                ticker,
                self.strategy.get_template_id(),
                self.strategy.get_min_data_points()
            );
        }

        let signal = self.strategy.generate_signal(series.closes());
        info!(
            "{}: SIGNAL={} {} at {:.4}",
            ticker,
            signal,
            self.strategy.parameters(),
            price
        );
        if signal == SignalAction::Hold {
            return Ok(TradeOutcome::Held);
        }

        if self.broker.has_open_orders()? {
            warn!("Open orders for the account; not trading {}", ticker);
            return Ok(TradeOutcome::Skipped(SkipReason::OpenOrders));
        }

        let quantity = order_quantity(self.spend_amount, price);
        if quantity == 0 {
            warn!(
                "Spend amount {:.2} buys no share of {} at {:.4}",
                self.spend_amount, ticker, price
            );
            return Ok(TradeOutcome::Skipped(SkipReason::ZeroQuantity));
        }

        match signal {
            SignalAction::Buy => {
                let available = self.broker.buying_power()?;
                let required = price * quantity as f64;
                if available < required {
                    warn!(
                        "Not enough buying power for {} ({:.2} < {:.2})",
                        ticker, available, required
                    );
                    return Ok(TradeOutcome::Skipped(
                        SkipReason::InsufficientBuyingPower {
                            available,
                            required,
                        },
                    ));
                }
            }
            SignalAction::Sell => {
                let held = self.broker.shares(ticker)?;
                if held < quantity {
                    warn!(
                        "Not enough shares of {} to sell ({} < {})",
                        ticker, held, quantity
                    );
                    return Ok(TradeOutcome::Skipped(SkipReason::InsufficientShares {
                        held,
                        required: quantity,
                    }));
                }
            }
            SignalAction::Hold => return Ok(TradeOutcome::Held),
        }

        self.broker
            .submit_limit_order(ticker, signal, price, quantity)?;
        info!(
            "Submitted limit {} order for {} {} @ {:.4}",
            signal, quantity, ticker, price
        );
        Ok(TradeOutcome::Submitted(OrderRequest {
            ticker: ticker.to_string(),
            side: signal,
            price,
            quantity,
        }))
    }
}

pub fn order_quantity(spend_amount: f64, price: f64) -> u64 {
    if !spend_amount.is_finite() || !price.is_finite() || price <= 0.0 || spend_amount <= 0.0 {
        return 0;
    }
    (spend_amount / price).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BandParameters;
    use crate::strategy::BollingerStrategy;
    use std::cell::RefCell;

    const BUY_TAIL: [f64; 4] = [100.0, 102.0, 101.0, 90.0];
    const SELL_TAIL: [f64; 6] = [100.0, 102.0, 101.0, 90.0, 95.0, 105.0];

    struct StaticFeed(Vec<f64>);

    impl PriceFeed for StaticFeed {
        fn latest_closes(&self, ticker: &str) -> Result<PriceSeries, FeedError> {
            if self.0.is_empty() {
                return Err(FeedError::Empty(ticker.to_string()));
            }
            Ok(PriceSeries::from_closes(self.0.clone()))
        }
    }

    struct FailingFeed;

    impl PriceFeed for FailingFeed {
        fn latest_closes(&self, _ticker: &str) -> Result<PriceSeries, FeedError> {
            Err(FeedError::Request("timeout".to_string()))
        }
    }

    #[derive(Default)]
    struct PaperAccount {
        buying_power: f64,
        shares: u64,
        open_orders: bool,
        submitted: RefCell<Vec<(SignalAction, f64, u64)>>,
    }

    impl BrokerAccount for PaperAccount {
        fn buying_power(&self) -> Result<f64, BrokerError> {
            Ok(self.buying_power)
        }

        fn shares(&self, _ticker: &str) -> Result<u64, BrokerError> {
            Ok(self.shares)
        }

        fn has_open_orders(&self) -> Result<bool, BrokerError> {
            Ok(self.open_orders)
        }

        fn submit_limit_order(
            &self,
            _ticker: &str,
            side: SignalAction,
            price: f64,
            quantity: u64,
        ) -> Result<(), BrokerError> {
            self.submitted.borrow_mut().push((side, price, quantity));
            Ok(())
        }
    }

    fn strategy() -> BollingerStrategy {
        BollingerStrategy::new(BandParameters::new(3, 1.0).unwrap()).unwrap()
    }

    #[test]
    fn submits_buy_sized_by_spend_amount() {
        let feed = StaticFeed(BUY_TAIL.to_vec());
        let account = PaperAccount {
            buying_power: 5_000.0,
            ..Default::default()
        };
        let strategy = strategy();
        let outcome = Trader::new(&feed, &account, &strategy, 1_000.0)
            .decide_and_act("SPY")
            .unwrap();

        assert_eq!(
            outcome,
            TradeOutcome::Submitted(OrderRequest {
                ticker: "SPY".to_string(),
                side: SignalAction::Buy,
                price: 90.0,
                quantity: 11,
            })
        );
        assert_eq!(*account.submitted.borrow(), vec![(SignalAction::Buy, 90.0, 11)]);
    }

    #[test]
    fn skips_when_account_cannot_fill() {
        let strategy = strategy();

        let poor = PaperAccount {
            buying_power: 500.0,
            ..Default::default()
        };
        let outcome = Trader::new(&StaticFeed(BUY_TAIL.to_vec()), &poor, &strategy, 1_000.0)
            .decide_and_act("SPY")
            .unwrap();
        assert_eq!(
            outcome,
            TradeOutcome::Skipped(SkipReason::InsufficientBuyingPower {
                available: 500.0,
                required: 990.0,
            })
        );

        let flat = PaperAccount {
            shares: 3,
            ..Default::default()
        };
        let outcome = Trader::new(&StaticFeed(SELL_TAIL.to_vec()), &flat, &strategy, 1_000.0)
            .decide_and_act("SPY")
            .unwrap();
        assert_eq!(
            outcome,
            TradeOutcome::Skipped(SkipReason::InsufficientShares {
                held: 3,
                required: 9,
            })
        );
        assert!(flat.submitted.borrow().is_empty());
    }

    #[test]
    fn open_orders_block_trading() {
        let account = PaperAccount {
            buying_power: 1e6,
            open_orders: true,
            ..Default::default()
        };
        let strategy = strategy();
        let outcome = Trader::new(&StaticFeed(BUY_TAIL.to_vec()), &account, &strategy, 1_000.0)
            .decide_and_act("SPY")
            .unwrap();
        assert_eq!(outcome, TradeOutcome::Skipped(SkipReason::OpenOrders));
    }

    #[test]
    fn hold_does_nothing() {
        let account = PaperAccount::default();
        let strategy = strategy();
        let outcome = Trader::new(&StaticFeed(vec![10.0; 8]), &account, &strategy, 1_000.0)
            .decide_and_act("SPY")
            .unwrap();
        assert_eq!(outcome, TradeOutcome::Held);
    }

    #[test]
    fn feed_failures_surface_as_feed_errors() {
        let account = PaperAccount::default();
        let strategy = strategy();
        let err = Trader::new(&FailingFeed, &account, &strategy, 1_000.0)
            .decide_and_act("SPY")
            .unwrap_err();
        assert!(matches!(err, TraderError::Feed(FeedError::Request(_))));

        let err = Trader::new(&StaticFeed(Vec::new()), &account, &strategy, 1_000.0)
            .decide_and_act("SPY")
            .unwrap_err();
        assert!(matches!(err, TraderError::Feed(FeedError::Empty(_))));
    }

    #[test]
    fn quantity_rounds_down_to_whole_shares() {
        assert_eq!(order_quantity(1_000.0, 90.0), 11);
        assert_eq!(order_quantity(50.0, 90.0), 0);
        assert_eq!(order_quantity(1_000.0, 0.0), 0);
    }
}
