//! Simple Moving Average indicator.
//!
//! SMA[i] = mean(C[i-n+1..=i]). First output at index n-1.

use crate::domain::candle::{closes, Candle};
use crate::domain::indicator::{sma_values, IndicatorKind, IndicatorSeries, IndicatorValue};

pub fn calculate_sma(candles: &[Candle], period: usize) -> IndicatorSeries {
    let kind = IndicatorKind::Sma { period };
    let values = sma_values(&closes(candles), period);
    if values.is_empty() {
        return IndicatorSeries::empty(kind);
    }

    let values = values.into_iter().map(IndicatorValue::Simple).collect();
    IndicatorSeries::aligned(kind, candles, period - 1, values)
}
