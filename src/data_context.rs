use crate::models::{PricePoint, PriceSeries};
use anyhow::{anyhow, Context, Result};
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Accepted shapes of a price file: a bare array of closes, an array of
/// `{ "date": ..., "close": ... }` bars, or an object wrapping either under `bars`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceFile {
    Closes(Vec<f64>),
    Bars(Vec<PricePoint>),
    Wrapped { bars: Vec<PricePoint> },
}

pub fn parse_price_series(json: &str) -> Result<PriceSeries> {
    let parsed: PriceFile =
        serde_json::from_str(json).map_err(|error| anyhow!("Invalid price JSON: {}", error))?;
    let series = match parsed {
        PriceFile::Closes(closes) => PriceSeries::from_closes(closes),
        PriceFile::Bars(bars) | PriceFile::Wrapped { bars } => PriceSeries::from_points(bars),
    };
    series.validate()?;
    Ok(series)
}

pub fn load_price_series(path: &Path) -> Result<PriceSeries> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read price file {}", path.display()))?;
    let series = parse_price_series(&raw)
        .with_context(|| format!("failed to parse price file {}", path.display()))?;
    info!(
        "Loaded {} price(s) from {}",
        series.len(),
        path.display()
    );
    Ok(series)
}
