use crate::error::EngineError;
use crate::models::{BandParameters, SignalAction};
use crate::signals;

/// Mean-reversion rule: buy when the close crosses below the lower band, sell when it
/// crosses above the upper band.
#[derive(Debug, Clone)]
pub struct BollingerStrategy {
    pub template_id: String,
    window: usize,
    sigma: f64,
}

impl BollingerStrategy {
    pub fn new(parameters: BandParameters) -> Result<Self, EngineError> {
        parameters.validate()?;
        Ok(Self {
            template_id: "bollinger".to_string(),
            window: parameters.window,
            sigma: parameters.sigma,
        })
    }
}

impl super::Strategy for BollingerStrategy {
    fn get_template_id(&self) -> &str {
        &self.template_id
    }

    fn generate_signal(&self, prices: &[f64]) -> SignalAction {
        signals::generate_signal(prices, self.window, self.sigma)
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn get_min_data_points(&self) -> usize {
        self.window + 1
    }

    fn parameters(&self) -> BandParameters {
        BandParameters {
            window: self.window,
            sigma: self.sigma,
        }
    }
}
