use crate::models::{BandParameters, SignalAction};

pub trait Strategy {
    fn get_template_id(&self) -> &str;
    /// Decision for the last observation of `prices`. Must not look past the slice.
    fn generate_signal(&self, prices: &[f64]) -> SignalAction;
    /// Number of leading observations a backtest skips before asking for signals.
    fn lookback(&self) -> usize;
    fn get_min_data_points(&self) -> usize;
    fn parameters(&self) -> BandParameters;
}

#[path = "strategies/bollinger.rs"]
pub mod bollinger;

pub use bollinger::BollingerStrategy;
