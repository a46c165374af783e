use crate::data_context::load_price_series;
use crate::models::{BandParameters, SignalAction};
use crate::strategy::{BollingerStrategy, Strategy};
use anyhow::Result;
use log::{info, warn};
use std::path::Path;

pub fn run(data_file: &Path, parameters: BandParameters) -> Result<SignalAction> {
    let series = load_price_series(data_file)?;
    let strategy = BollingerStrategy::new(parameters)?;
    if series.len() < strategy.get_min_data_points() {
        warn!(
            "{} price(s) loaded; {} needs {} for a defined signal.",
            series.len(),
            parameters,
            strategy.get_min_data_points()
        );
    }

    let signal = strategy.generate_signal(series.closes());
    info!("Bands: SIGNAL={} {}", signal, parameters);
    println!("{}", signal);
    Ok(signal)
}
