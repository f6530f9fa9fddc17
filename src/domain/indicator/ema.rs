//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the SMA of the first n closes, then
//! EMA[i] = (C[i] - EMA[i-1]) * k + EMA[i-1].
//! First output at index n-1.

use crate::domain::candle::{closes, Candle};
use crate::domain::indicator::{ema_values, IndicatorKind, IndicatorSeries, IndicatorValue};

pub fn calculate_ema(candles: &[Candle], period: usize) -> IndicatorSeries {
    let kind = IndicatorKind::Ema { period };
    let values = ema_values(&closes(candles), period);
    if values.is_empty() {
        return IndicatorSeries::empty(kind);
    }

    let values = values.into_iter().map(IndicatorValue::Simple).collect();
    IndicatorSeries::aligned(kind, candles, period - 1, values)
}
