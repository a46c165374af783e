use crate::models::{BandParameters, ParameterRange};
use crate::param_utils::{parse_range, DEFAULT_SIGMA_PRECISION};
use anyhow::{anyhow, Result};
use std::collections::HashMap;

pub const DEFAULT_WINDOW: usize = 5;
pub const DEFAULT_SIGMA: f64 = 1.78;
pub const DEFAULT_SPEND_AMOUNT: f64 = 1000.0;

/// Settings consumed by the commands. Every key is optional and falls back to the
/// defaults of the band rule.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub band: BandParameters,
    pub window_range: ParameterRange,
    pub sigma_range: ParameterRange,
    pub workers: usize,
    pub sigma_precision: u32,
    pub spend_amount: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            band: BandParameters {
                window: DEFAULT_WINDOW,
                sigma: DEFAULT_SIGMA,
            },
            window_range: ParameterRange {
                min: 5.0,
                max: 21.0,
                step: 2.0,
            },
            sigma_range: ParameterRange {
                min: 1.65,
                max: 1.99,
                step: 0.01,
            },
            workers: std::cmp::max(1, num_cpus::get()),
            sigma_precision: DEFAULT_SIGMA_PRECISION,
            spend_amount: DEFAULT_SPEND_AMOUNT,
        }
    }
}

impl EngineSettings {
    pub fn from_settings_map(settings: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();

        let window = optional_setting_usize(settings, "BAND_WINDOW", 2)?
            .unwrap_or(defaults.band.window);
        let sigma = optional_setting_f64(settings, "BAND_SIGMA", Some(0.0), None)?
            .unwrap_or(defaults.band.sigma);
        let band = BandParameters::new(window, sigma)?;

        let window_range = optional_setting_range(settings, "OPTIMIZER_WINDOW_RANGE")?
            .unwrap_or(defaults.window_range);
        let sigma_range = optional_setting_range(settings, "OPTIMIZER_SIGMA_RANGE")?
            .unwrap_or(defaults.sigma_range);
        let workers =
            optional_setting_usize(settings, "OPTIMIZER_WORKERS", 1)?.unwrap_or(defaults.workers);
        let sigma_precision = optional_setting_usize(settings, "SIGMA_PRECISION", 0)?
            .map(|value| value as u32)
            .unwrap_or(defaults.sigma_precision);
        if sigma_precision > 9 {
            return Err(anyhow!(
                "Setting SIGMA_PRECISION must be <= 9 (value: {})",
                sigma_precision
            ));
        }
        let spend_amount =
            optional_setting_f64(settings, "TRADER_SPEND_AMOUNT", Some(0.0), None)?
                .unwrap_or(defaults.spend_amount);

        Ok(Self {
            band,
            window_range,
            sigma_range,
            workers,
            sigma_precision,
            spend_amount,
        })
    }

    pub fn from_env() -> Result<Self> {
        let settings: HashMap<String, String> = std::env::vars().collect();
        Self::from_settings_map(&settings)
    }
}

fn optional_setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn optional_setting_f64(
    settings: &HashMap<String, String>,
    key: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<Option<f64>> {
    let Some(raw) = optional_setting(settings, key) else {
        return Ok(None);
    };
    let value = raw
        .parse::<f64>()
        .map_err(|_| anyhow!("Setting {} must be a number (value: {})", key, raw))?;
    if !value.is_finite() {
        return Err(anyhow!("Setting {} must be finite (value: {})", key, raw));
    }
    if let Some(min_value) = min {
        if value <= min_value {
            return Err(anyhow!(
                "Setting {} must be > {} (value: {})",
                key,
                min_value,
                raw
            ));
        }
    }
    if let Some(max_value) = max {
        if value > max_value {
            return Err(anyhow!(
                "Setting {} must be <= {} (value: {})",
                key,
                max_value,
                raw
            ));
        }
    }
    Ok(Some(value))
}

fn optional_setting_usize(
    settings: &HashMap<String, String>,
    key: &str,
    min: usize,
) -> Result<Option<usize>> {
    let Some(raw) = optional_setting(settings, key) else {
        return Ok(None);
    };
    let value = raw
        .parse::<f64>()
        .map_err(|_| anyhow!("Setting {} must be a number (value: {})", key, raw))?;
    if !value.is_finite() {
        return Err(anyhow!("Setting {} must be finite (value: {})", key, raw));
    }
    if value.fract() != 0.0 {
        return Err(anyhow!(
            "Setting {} must be an integer (value: {})",
            key,
            raw
        ));
    }
    if value < min as f64 {
        return Err(anyhow!(
            "Setting {} must be >= {} (value: {})",
            key,
            min,
            raw
        ));
    }
    Ok(Some(value as usize))
}

fn optional_setting_range(
    settings: &HashMap<String, String>,
    key: &str,
) -> Result<Option<ParameterRange>> {
    let Some(raw) = optional_setting(settings, key) else {
        return Ok(None);
    };
    parse_range(raw)
        .map(Some)
        .map_err(|err| anyhow!("Setting {} is not a valid range: {}", key, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_map_uses_defaults() {
        let resolved = EngineSettings::from_settings_map(&HashMap::new()).unwrap();
        assert_eq!(resolved.band, BandParameters { window: 5, sigma: 1.78 });
        assert_eq!(resolved.window_range.max, 21.0);
        assert_eq!(resolved.sigma_range.min, 1.65);
        assert_eq!(resolved.sigma_precision, 2);
        assert!(resolved.workers >= 1);
    }

    #[test]
    fn reads_overrides() {
        let resolved = EngineSettings::from_settings_map(&settings(&[
            ("BAND_WINDOW", "12"),
            ("BAND_SIGMA", " 2.1 "),
            ("OPTIMIZER_WINDOW_RANGE", "3,9,3"),
            ("OPTIMIZER_SIGMA_RANGE", "[1.0, 2.0, 0.5]"),
            ("OPTIMIZER_WORKERS", "3"),
            ("SIGMA_PRECISION", "3"),
            ("TRADER_SPEND_AMOUNT", "250"),
            ("BAND_UNRELATED", "ignored"),
        ]))
        .unwrap();
        assert_eq!(resolved.band, BandParameters { window: 12, sigma: 2.1 });
        assert_eq!(resolved.window_range, ParameterRange { min: 3.0, max: 9.0, step: 3.0 });
        assert_eq!(resolved.sigma_range.step, 0.5);
        assert_eq!(resolved.workers, 3);
        assert_eq!(resolved.sigma_precision, 3);
        assert_eq!(resolved.spend_amount, 250.0);
    }

    #[test]
    fn rejects_malformed_values() {
        for pairs in [
            [("BAND_WINDOW", "1")],
            [("BAND_WINDOW", "4.5")],
            [("BAND_SIGMA", "0")],
            [("BAND_SIGMA", "abc")],
            [("OPTIMIZER_WINDOW_RANGE", "9,3,1")],
            [("OPTIMIZER_WORKERS", "0")],
            [("SIGMA_PRECISION", "12")],
            [("TRADER_SPEND_AMOUNT", "-5")],
        ] {
            assert!(
                EngineSettings::from_settings_map(&settings(&pairs)).is_err(),
                "{:?} should be rejected",
                pairs
            );
        }
    }
}
