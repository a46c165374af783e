use crate::error::EngineError;
use crate::models::{BandParameters, ParameterRange};

/// Decimal places kept when sigma is used as a deduplication key.
pub const DEFAULT_SIGMA_PRECISION: u32 = 2;

/// Upper bound on the number of values a single range may enumerate.
pub const MAX_RANGE_VALUES: usize = 100_000;

const RANGE_TOLERANCE: f64 = 1e-9;

impl ParameterRange {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self, EngineError> {
        let range = Self { min, max, step };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.min.is_finite() || !self.max.is_finite() || !self.step.is_finite() {
            return Err(EngineError::invalid_parameter(
                "range",
                format!("bounds and step must be finite ({:?})", self),
            ));
        }
        if self.step <= 0.0 {
            return Err(EngineError::invalid_parameter(
                "range",
                format!("step must be > 0 (value: {})", self.step),
            ));
        }
        if self.max < self.min {
            return Err(EngineError::invalid_parameter(
                "range",
                format!("max ({}) must be >= min ({})", self.max, self.min),
            ));
        }
        Ok(())
    }

    /// `min, min + step, ...` up to and including `max`. Each value is computed as
    /// `min + k * step` so that long ranges do not drift.
    pub fn values(&self) -> Result<Vec<f64>, EngineError> {
        self.validate()?;
        let steps = ((self.max - self.min) / self.step + RANGE_TOLERANCE).floor();
        if !steps.is_finite() || steps >= MAX_RANGE_VALUES as f64 {
            return Err(EngineError::invalid_parameter(
                "range",
                format!(
                    "enumerates more than {} values ({:?})",
                    MAX_RANGE_VALUES, self
                ),
            ));
        }
        let count = steps as usize + 1;
        Ok((0..count)
            .map(|k| self.min + k as f64 * self.step)
            .collect())
    }
}

/// Rounds `sigma` to `precision` decimal places (half away from zero).
pub fn normalize_sigma(sigma: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (sigma * factor).round() / factor
}

/// Integer key of a sigma at `precision` decimals; equal keys mean the same grid cell.
pub fn sigma_key(sigma: f64, precision: u32) -> i64 {
    let factor = 10f64.powi(precision as i32);
    (sigma * factor).round() as i64
}

pub fn parameter_signature(parameters: &BandParameters, precision: u32) -> (usize, i64) {
    (parameters.window, sigma_key(parameters.sigma, precision))
}

/// Integer window candidates; every value must be a whole number >= 2.
pub fn window_candidates(range: &ParameterRange) -> Result<Vec<usize>, EngineError> {
    range
        .values()?
        .into_iter()
        .map(|value| {
            let rounded = value.round();
            if (value - rounded).abs() > RANGE_TOLERANCE || rounded < 2.0 {
                return Err(EngineError::invalid_parameter(
                    "window",
                    format!("candidates must be whole numbers >= 2 (value: {})", value),
                ));
            }
            Ok(rounded as usize)
        })
        .collect()
}

/// Sigma candidates normalized to `precision` decimals; every value must be > 0.
pub fn sigma_candidates(range: &ParameterRange, precision: u32) -> Result<Vec<f64>, EngineError> {
    range
        .values()?
        .into_iter()
        .map(|value| {
            let normalized = normalize_sigma(value, precision);
            if normalized <= 0.0 {
                return Err(EngineError::invalid_parameter(
                    "sigma",
                    format!("candidates must be > 0 (value: {})", value),
                ));
            }
            Ok(normalized)
        })
        .collect()
}

/// Cross product in window-major order, the order in which ties are resolved.
pub fn build_grid(windows: &[usize], sigmas: &[f64]) -> Vec<BandParameters> {
    let mut grid = Vec::with_capacity(windows.len() * sigmas.len());
    for &window in windows {
        for &sigma in sigmas {
            grid.push(BandParameters { window, sigma });
        }
    }
    grid
}

/// Parses `min,max,step` (brackets and whitespace separators are accepted).
pub fn parse_range(raw: &str) -> Result<ParameterRange, EngineError> {
    let trimmed = raw.trim().trim_matches(|c| c == '[' || c == ']');
    let mut values = Vec::new();
    for part in trimmed.split(|c: char| c == ',' || c.is_whitespace()) {
        let entry = part.trim();
        if entry.is_empty() {
            continue;
        }
        let value = entry.parse::<f64>().map_err(|_| {
            EngineError::invalid_parameter(
                "range",
                format!("expected min,max,step (value: {})", raw),
            )
        })?;
        values.push(value);
    }

    match values.as_slice() {
        [min, max, step] => ParameterRange::new(*min, *max, *step),
        [single] => ParameterRange::new(*single, *single, 1.0),
        _ => Err(EngineError::invalid_parameter(
            "range",
            format!("expected min,max,step (value: {})", raw),
        )),
    }
}
