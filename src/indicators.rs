use crate::models::Band;
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Band of the trailing `window` closes ending at `index` (inclusive).
///
/// Returns `None` while fewer than `window` observations are available, for a window
/// shorter than two (the sample standard deviation needs two points) and for an index
/// past the end of `prices`.
pub fn band_at(prices: &[f64], window: usize, sigma: f64, index: usize) -> Option<Band> {
    if window < 2 || index >= prices.len() || index + 1 < window {
        return None;
    }
    let slice = &prices[index + 1 - window..=index];
    let middle = slice.iter().mean();
    let std_dev = slice.iter().std_dev();
    Some(Band::from_moments(middle, std_dev, sigma))
}

/// Bands for every index of `prices`; indices before `window - 1` are `None`.
pub fn calculate_bollinger_bands(prices: &[f64], window: usize, sigma: f64) -> Vec<Option<Band>> {
    if window < 2 {
        return vec![None; prices.len()];
    }
    let mut rolling = RollingBands::new(window, sigma);
    prices.iter().map(|&price| rolling.push(price)).collect()
}

/// Incremental rolling mean / sample variance over a fixed window, O(1) per update.
///
/// Sums are kept relative to the first observation to limit cancellation when the
/// variance is small compared to the price level. A window of identical prices is
/// detected from the trailing run length and collapses to an exact zero-width band.
#[derive(Debug, Clone)]
pub struct RollingBands {
    window: usize,
    sigma: f64,
    values: VecDeque<f64>,
    shift: Option<f64>,
    sum: f64,
    sum_sq: f64,
    constant_run: usize,
}

impl RollingBands {
    pub fn new(window: usize, sigma: f64) -> Self {
        Self {
            window,
            sigma,
            values: VecDeque::with_capacity(window + 1),
            shift: None,
            sum: 0.0,
            sum_sq: 0.0,
            constant_run: 0,
        }
    }

    pub fn push(&mut self, price: f64) -> Option<Band> {
        let shift = *self.shift.get_or_insert(price);
        self.constant_run = match self.values.back() {
            Some(&previous) if previous == price => self.constant_run + 1,
            _ => 1,
        };
        let centered = price - shift;
        self.values.push_back(price);
        self.sum += centered;
        self.sum_sq += centered * centered;

        if self.values.len() > self.window {
            if let Some(old) = self.values.pop_front() {
                let old = old - shift;
                self.sum -= old;
                self.sum_sq -= old * old;
            }
        }

        self.current()
    }

    pub fn current(&self) -> Option<Band> {
        if self.window < 2 || self.values.len() < self.window {
            return None;
        }
        if self.constant_run >= self.window {
            let price = *self.values.back()?;
            return Some(Band::from_moments(price, 0.0, self.sigma));
        }
        let shift = self.shift?;
        let n = self.window as f64;
        let mean = self.sum / n;
        let variance = ((self.sum_sq - self.sum * mean) / (n - 1.0)).max(0.0);
        Some(Band::from_moments(mean + shift, variance.sqrt(), self.sigma))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn band_uses_sample_standard_deviation() {
        let band = band_at(&[100.0, 102.0, 101.0], 3, 1.0, 2).unwrap();
        assert!((band.middle - 101.0).abs() < 1e-12);
        assert!((band.upper - 102.0).abs() < 1e-12);
        assert!((band.lower - 100.0).abs() < 1e-12);
    }

    #[test]
    fn band_is_undefined_before_full_window() {
        let prices = [100.0, 102.0, 101.0, 90.0];
        assert!(band_at(&prices, 3, 1.0, 0).is_none());
        assert!(band_at(&prices, 3, 1.0, 1).is_none());
        assert!(band_at(&prices, 3, 1.0, 2).is_some());
        assert!(band_at(&prices, 3, 1.0, 4).is_none());
        assert!(band_at(&prices, 1, 1.0, 3).is_none());

        let bands = calculate_bollinger_bands(&prices, 3, 1.0);
        assert_eq!(bands.len(), prices.len());
        assert!(bands[0].is_none() && bands[1].is_none());
        assert!(bands[2].is_some() && bands[3].is_some());
    }

    #[test]
    fn constant_window_collapses_band() {
        let prices = vec![42.5; 8];
        for band in calculate_bollinger_bands(&prices, 4, 2.0).into_iter().flatten() {
            assert_eq!(band.upper, band.middle);
            assert_eq!(band.lower, band.middle);
            assert!((band.middle - 42.5).abs() < 1e-12);
        }
        let exact = band_at(&prices, 4, 2.0, 7).unwrap();
        assert_eq!(exact.upper, 42.5);
        assert_eq!(exact.lower, 42.5);
    }

    #[test]
    fn flat_run_after_volatile_prices_collapses_exactly() {
        let mut prices = vec![100.0, 137.3, 91.7, 123.9, 88.1, 150.3, 77.7];
        prices.extend(std::iter::repeat(101.37).take(10));
        let bands = calculate_bollinger_bands(&prices, 3, 2.0);
        for index in 9..prices.len() {
            let band = bands[index].unwrap();
            assert_eq!(band.middle, 101.37, "index {}", index);
            assert_eq!(band.upper, 101.37, "index {}", index);
            assert_eq!(band.lower, 101.37, "index {}", index);
            assert_eq!(Some(band), band_at(&prices, 3, 2.0, index));
        }
        // the run is shorter than the window at index 8
        assert!(bands[8].unwrap().upper > 101.37);
    }

    #[test]
    fn rolling_bands_match_direct_computation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut price = 250.0;
        let prices: Vec<f64> = (0..400)
            .map(|_| {
                price *= 1.0 + rng.gen_range(-0.02..0.02);
                price
            })
            .collect();

        for window in [2usize, 5, 13, 40] {
            let rolling = calculate_bollinger_bands(&prices, window, 1.8);
            for (index, band) in rolling.iter().enumerate() {
                match (band, band_at(&prices, window, 1.8, index)) {
                    (Some(a), Some(b)) => {
                        assert!((a.middle - b.middle).abs() < 1e-8);
                        assert!((a.upper - b.upper).abs() < 1e-8);
                        assert!((a.lower - b.lower).abs() < 1e-8);
                    }
                    (None, None) => {}
                    other => panic!("definedness mismatch at {}: {:?}", index, other),
                }
            }
        }
    }

    #[test]
    fn bands_are_ordered_for_random_series() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let len = rng.gen_range(2..120);
            let prices: Vec<f64> = (0..len).map(|_| rng.gen_range(1.0..500.0)).collect();
            let window = rng.gen_range(2..=len.max(2));
            let sigma = rng.gen_range(0.1..3.0);
            for index in 0..prices.len() {
                if let Some(band) = band_at(&prices, window, sigma, index) {
                    assert!(band.upper >= band.middle);
                    assert!(band.middle >= band.lower);
                }
            }
        }
    }
}
