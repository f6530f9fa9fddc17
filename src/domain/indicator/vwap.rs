//! Volume Weighted Average Price.
//!
//! VWAP[i] = Σ(TP * V) / ΣV from the start of the window, TP = (H + L + C) / 3.
//! No warm-up: output starts at the first candle with non-zero cumulative volume.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorKind, IndicatorSeries, IndicatorValue};

pub fn calculate_vwap(candles: &[Candle]) -> IndicatorSeries {
    let mut cumulative_pv = 0.0;
    let mut cumulative_volume = 0.0;
    let mut offset = None;
    let mut values = Vec::with_capacity(candles.len());

    for (i, candle) in candles.iter().enumerate() {
        cumulative_pv += candle.typical_price() * candle.volume;
        cumulative_volume += candle.volume;
        if offset.is_none() && cumulative_volume == 0.0 {
            continue;
        }
        offset.get_or_insert(i);
        // one point per candle once started; NaN reads as missing
        let vwap = if cumulative_volume == 0.0 {
            f64::NAN
        } else {
            cumulative_pv / cumulative_volume
        };
        values.push(IndicatorValue::Simple(vwap));
    }

    match offset {
        Some(offset) => IndicatorSeries::aligned(IndicatorKind::Vwap, candles, offset, values),
        None => IndicatorSeries::empty(IndicatorKind::Vwap),
    }
}
