//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow), over the index range both EMAs cover
//! Signal Line = EMA(signal) of the MACD Line, seeded with its first SMA
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! First output at index max(fast, slow) - 1 + signal - 1.

use crate::domain::candle::{closes, Candle};
use crate::domain::indicator::{ema_values, IndicatorKind, IndicatorSeries, IndicatorValue};

pub fn calculate_macd(
    candles: &[Candle],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let kind = IndicatorKind::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries::empty(kind);
    }

    let prices = closes(candles);
    let ema_fast = ema_values(&prices, fast);
    let ema_slow = ema_values(&prices, slow);
    if ema_fast.is_empty() || ema_slow.is_empty() {
        return IndicatorSeries::empty(kind);
    }

    // ema_fast[j] belongs to candle j + fast - 1; likewise for slow.
    let line_start = fast.max(slow) - 1;
    let macd_line: Vec<f64> = (line_start..candles.len())
        .map(|i| ema_fast[i + 1 - fast] - ema_slow[i + 1 - slow])
        .collect();

    let signal_line = ema_values(&macd_line, signal_period);
    if signal_line.is_empty() {
        return IndicatorSeries::empty(kind);
    }

    let values = signal_line
        .iter()
        .enumerate()
        .map(|(j, &signal)| {
            let macd = macd_line[j + signal_period - 1];
            IndicatorValue::Macd {
                macd,
                signal,
                histogram: macd - signal,
            }
        })
        .collect();

    IndicatorSeries::aligned(kind, candles, line_start + signal_period - 1, values)
}
