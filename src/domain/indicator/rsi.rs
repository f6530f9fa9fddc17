//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n price changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! First output at index n (n price changes need n+1 closes).

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorKind, IndicatorSeries, IndicatorValue};

pub fn calculate_rsi(candles: &[Candle], period: usize) -> IndicatorSeries {
    let kind = IndicatorKind::Rsi { period };
    if period == 0 || candles.len() < period + 1 {
        return IndicatorSeries::empty(kind);
    }

    let mut gains: Vec<f64> = Vec::with_capacity(candles.len() - 1);
    let mut losses: Vec<f64> = Vec::with_capacity(candles.len() - 1);
    for pair in candles.windows(2) {
        let change = pair[1].close - pair[0].close;
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    let mut values = Vec::with_capacity(gains.len() - period + 1);
    values.push(IndicatorValue::Simple(rsi_from(avg_gain, avg_loss)));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        values.push(IndicatorValue::Simple(rsi_from(avg_gain, avg_loss)));
    }

    IndicatorSeries::aligned(kind, candles, period, values)
}

fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
