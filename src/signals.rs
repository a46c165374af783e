use crate::indicators::band_at;
use crate::models::{Band, SignalAction};

/// Edge detector over two consecutive banded observations.
///
/// Buy on a downward crossing of the lower band, sell on an upward crossing of the
/// upper band. A price that stays outside a band keeps returning `Hold`.
pub fn crossing_signal(
    previous_price: f64,
    previous_band: &Band,
    current_price: f64,
    current_band: &Band,
) -> SignalAction {
    if current_price < current_band.lower && previous_price >= previous_band.lower {
        SignalAction::Buy
    } else if current_price > current_band.upper && previous_price <= previous_band.upper {
        SignalAction::Sell
    } else {
        SignalAction::Hold
    }
}

/// Signal at index `t`, comparing it with `t - 1`. Only `prices[..=t]` is read.
pub fn signal_at(prices: &[f64], window: usize, sigma: f64, t: usize) -> SignalAction {
    if t == 0 || t >= prices.len() {
        return SignalAction::Hold;
    }
    let (Some(previous_band), Some(current_band)) = (
        band_at(prices, window, sigma, t - 1),
        band_at(prices, window, sigma, t),
    ) else {
        return SignalAction::Hold;
    };
    crossing_signal(prices[t - 1], &previous_band, prices[t], &current_band)
}

/// Signal for the most recent observation of `prices`.
pub fn generate_signal(prices: &[f64], window: usize, sigma: f64) -> SignalAction {
    if prices.len() < 2 {
        return SignalAction::Hold;
    }
    signal_at(prices, window, sigma, prices.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(middle: f64, half_width: f64) -> Band {
        Band {
            middle,
            upper: middle + half_width,
            lower: middle - half_width,
        }
    }

    #[test]
    fn detects_downward_crossing_of_lower_band() {
        let b = band(100.0, 2.0);
        assert_eq!(crossing_signal(99.0, &b, 97.0, &b), SignalAction::Buy);
        // touching the lower band on the previous bar still counts as inside
        assert_eq!(crossing_signal(98.0, &b, 97.0, &b), SignalAction::Buy);
        assert_eq!(crossing_signal(97.5, &b, 97.0, &b), SignalAction::Hold);
    }

    #[test]
    fn detects_upward_crossing_of_upper_band() {
        let b = band(100.0, 2.0);
        assert_eq!(crossing_signal(101.0, &b, 103.0, &b), SignalAction::Sell);
        assert_eq!(crossing_signal(102.0, &b, 103.0, &b), SignalAction::Sell);
        assert_eq!(crossing_signal(102.5, &b, 103.0, &b), SignalAction::Hold);
    }

    #[test]
    fn holds_without_two_banded_indices() {
        let prices = [100.0, 102.0, 101.0, 90.0];
        assert_eq!(generate_signal(&prices[..3], 3, 1.0), SignalAction::Hold);
        assert_eq!(generate_signal(&prices[..1], 3, 1.0), SignalAction::Hold);
        assert_eq!(generate_signal(&[], 3, 1.0), SignalAction::Hold);
        assert_eq!(signal_at(&prices, 3, 1.0, 0), SignalAction::Hold);
        assert_eq!(signal_at(&prices, 3, 1.0, 9), SignalAction::Hold);
    }

    #[test]
    fn first_crossing_of_reference_series_is_a_buy() {
        let prices = [100.0, 102.0, 101.0, 90.0, 95.0, 105.0, 103.0];
        assert_eq!(generate_signal(&prices[..4], 3, 1.0), SignalAction::Buy);
        assert_eq!(generate_signal(&prices[..5], 3, 1.0), SignalAction::Hold);
        assert_eq!(generate_signal(&prices[..6], 3, 1.0), SignalAction::Sell);
    }

    #[test]
    fn sustained_decline_buys_once() {
        let mut prices = vec![100.0; 6];
        let mut price = 100.0;
        for _ in 0..12 {
            price *= 0.8;
            prices.push(price);
        }
        let signals: Vec<SignalAction> = (0..prices.len())
            .map(|t| signal_at(&prices, 5, 1.0, t))
            .collect();
        let buys = signals.iter().filter(|s| **s == SignalAction::Buy).count();
        assert_eq!(buys, 1);
        assert_eq!(signals[6], SignalAction::Buy);
        assert!(signals[7..].iter().all(|s| *s == SignalAction::Hold));
    }

    #[test]
    fn constant_series_never_signals() {
        let prices = vec![50.0; 30];
        for t in 0..prices.len() {
            assert_eq!(signal_at(&prices, 4, 0.5, t), SignalAction::Hold);
        }
    }
}
