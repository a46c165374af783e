use crate::error::EngineError;
use crate::performance::BacktestPerformance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    pub close: f64,
}

/// Ordered closing prices, optionally time-stamped. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    closes: Vec<f64>,
    dates: Option<Vec<DateTime<Utc>>>,
}

impl PriceSeries {
    pub fn from_closes(closes: Vec<f64>) -> Self {
        Self {
            closes,
            dates: None,
        }
    }

    /// Dates are kept only when every point carries one.
    pub fn from_points(points: Vec<PricePoint>) -> Self {
        let dates: Option<Vec<DateTime<Utc>>> = points.iter().map(|p| p.date).collect();
        let closes = points.into_iter().map(|p| p.close).collect();
        Self { closes, dates }
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn date(&self, index: usize) -> Option<DateTime<Utc>> {
        self.dates
            .as_ref()
            .and_then(|dates| dates.get(index).copied())
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn first(&self) -> Option<f64> {
        self.closes.first().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.closes.last().copied()
    }

    /// Every price must be finite and strictly positive: the net-return baseline divides by
    /// the first close.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (index, price) in self.closes.iter().enumerate() {
            if !price.is_finite() || *price <= 0.0 {
                return Err(EngineError::InvalidSeries(format!(
                    "price at index {} must be finite and positive (value: {})",
                    index, price
                )));
            }
        }
        Ok(())
    }
}

impl From<Vec<f64>> for PriceSeries {
    fn from(closes: Vec<f64>) -> Self {
        Self::from_closes(closes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

impl Band {
    pub fn from_moments(middle: f64, std_dev: f64, sigma: f64) -> Self {
        let width = sigma * std_dev.max(0.0);
        Self {
            middle,
            upper: middle + width,
            lower: middle - width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl SignalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Buy => "buy",
            SignalAction::Sell => "sell",
            SignalAction::Hold => "hold",
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope configuration: trailing window length and standard deviation multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandParameters {
    pub window: usize,
    pub sigma: f64,
}

impl BandParameters {
    pub fn new(window: usize, sigma: f64) -> Result<Self, EngineError> {
        let params = Self { window, sigma };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.window < 2 {
            return Err(EngineError::invalid_parameter(
                "window",
                format!("must be >= 2 (value: {})", self.window),
            ));
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(EngineError::invalid_parameter(
                "sigma",
                format!("must be finite and > 0 (value: {})", self.sigma),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for BandParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(window={}, sigma={})", self.window, self.sigma)
    }
}

/// One simulated step of a backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestStep {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    pub price: f64,
    pub signal: SignalAction,
    pub net: f64,
    pub cash: f64,
    pub shares: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub parameters: BandParameters,
    pub steps: Vec<BacktestStep>,
    pub performance: BacktestPerformance,
}

impl BacktestReport {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn final_net(&self) -> f64 {
        self.performance.final_net
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Score of one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterResult {
    pub parameters: BandParameters,
    pub net_return: f64,
    pub total_trades: usize,
}

// Worker communication structures
#[derive(Debug, Clone)]
pub struct BacktestTask {
    pub id: usize,
    pub parameters: BandParameters,
}

#[derive(Debug, Clone)]
pub struct BacktestTaskResult {
    pub task_id: usize,
    pub result: Option<ParameterResult>,
    pub expired: bool,
    pub error: Option<String>,
}
