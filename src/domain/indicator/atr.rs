//! Average True Range indicator.
//!
//! TR[i] = max(H[i] - L[i], |H[i] - C[i-1]|, |L[i] - C[i-1]|) for i >= 1.
//! Seed = mean of the first n true ranges, then Wilder smoothing:
//! ATR = (prev * (n-1) + TR) / n. First output at index n.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorKind, IndicatorSeries, IndicatorValue};

pub fn calculate_atr(candles: &[Candle], period: usize) -> IndicatorSeries {
    let kind = IndicatorKind::Atr { period };
    if period == 0 || candles.len() < period + 1 {
        return IndicatorSeries::empty(kind);
    }

    let true_ranges: Vec<f64> = candles
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .collect();

    let mut atr = true_ranges[..period].iter().sum::<f64>() / period as f64;
    let mut values = Vec::with_capacity(true_ranges.len() - period + 1);
    values.push(IndicatorValue::Simple(atr));

    for tr in &true_ranges[period..] {
        atr = (atr * (period - 1) as f64 + tr) / period as f64;
        values.push(IndicatorValue::Simple(atr));
    }

    IndicatorSeries::aligned(kind, candles, period, values)
}
