//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (k × StdDev)
//! - Lower: Middle - (k × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, k=2.0
//! First output at index period-1.

use crate::domain::candle::{closes, Candle};
use crate::domain::indicator::{IndicatorKind, IndicatorSeries, IndicatorValue};

pub fn calculate_bollinger(candles: &[Candle], period: usize, k: f64) -> IndicatorSeries {
    let kind = IndicatorKind::Bollinger { period, k };
    if period == 0 || candles.len() < period {
        return IndicatorSeries::empty(kind);
    }

    let values = closes(candles)
        .windows(period)
        .map(|window| {
            let middle = window.iter().sum::<f64>() / period as f64;
            let half_width = k * population_stddev(window, middle);
            IndicatorValue::Bollinger {
                upper: middle + half_width,
                middle,
                lower: middle - half_width,
            }
        })
        .collect();

    IndicatorSeries::aligned(kind, candles, period - 1, values)
}

fn population_stddev(window: &[f64], mean: f64) -> f64 {
    let variance = window
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / window.len() as f64;
    variance.sqrt()
}
