//! Stochastic Oscillator indicator.
//!
//! %K[i] = (C[i] - LL) / (HH - LL) * 100 over the trailing k_period highs/lows,
//! defined as 50 when HH == LL. %D = SMA(d_period) of %K.
//! First output at index k_period - 1 + d_period - 1.

use crate::domain::candle::Candle;
use crate::domain::indicator::{sma_values, IndicatorKind, IndicatorSeries, IndicatorValue};

pub fn calculate_stochastic(candles: &[Candle], k_period: usize, d_period: usize) -> IndicatorSeries {
    let kind = IndicatorKind::Stochastic { k_period, d_period };
    if k_period == 0 || d_period == 0 || candles.len() < k_period {
        return IndicatorSeries::empty(kind);
    }

    let percent_k: Vec<f64> = candles
        .windows(k_period)
        .map(|window| {
            let lowest = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let highest = window
                .iter()
                .map(|c| c.high)
                .fold(f64::NEG_INFINITY, f64::max);
            let close = window[window.len() - 1].close;
            if highest == lowest {
                50.0
            } else {
                (close - lowest) / (highest - lowest) * 100.0
            }
        })
        .collect();

    let percent_d = sma_values(&percent_k, d_period);
    if percent_d.is_empty() {
        return IndicatorSeries::empty(kind);
    }

    let values = percent_d
        .iter()
        .enumerate()
        .map(|(j, &d)| IndicatorValue::Stochastic {
            k: percent_k[j + d_period - 1],
            d,
        })
        .collect();

    IndicatorSeries::aligned(kind, candles, k_period - 1 + d_period - 1, values)
}
