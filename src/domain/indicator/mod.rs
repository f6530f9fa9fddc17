//! Technical indicator engine.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorKind`: closed enum of indicator identity + parameters
//! - `IndicatorConfig`: an indicator kind bound to the field key rules use
//! - `IndicatorValue`: enum for the different indicator output shapes
//! - `IndicatorSeries`: the output points, aligned to a suffix of the candles
//!
//! Every calculation is pure. Too few candles for a single output point
//! yields an empty series rather than an error, so consumers see "no value
//! yet" and rules evaluate false.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod vwap;

use crate::domain::candle::Candle;
use crate::domain::error::RuletraderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        macd: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
}

impl IndicatorValue {
    /// Resolve an optional sub-field. A missing sub-field selects the
    /// primary output (MACD line, middle band, %K).
    pub fn field(&self, sub: Option<&str>) -> Option<f64> {
        match (self, sub) {
            (IndicatorValue::Simple(v), None | Some("value")) => Some(*v),
            (IndicatorValue::Macd { macd, .. }, None | Some("macd") | Some("line")) => Some(*macd),
            (IndicatorValue::Macd { signal, .. }, Some("signal")) => Some(*signal),
            (IndicatorValue::Macd { histogram, .. }, Some("histogram") | Some("hist")) => {
                Some(*histogram)
            }
            (IndicatorValue::Bollinger { middle, .. }, None | Some("middle")) => Some(*middle),
            (IndicatorValue::Bollinger { upper, .. }, Some("upper")) => Some(*upper),
            (IndicatorValue::Bollinger { lower, .. }, Some("lower")) => Some(*lower),
            (IndicatorValue::Stochastic { k, .. }, None | Some("k")) => Some(*k),
            (IndicatorValue::Stochastic { d, .. }, Some("d")) => Some(*d),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub time: DateTime<Utc>,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma { period: usize },
    Ema { period: usize },
    Rsi { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    Bollinger { period: usize, k: f64 },
    Stochastic { k_period: usize, d_period: usize },
    Atr { period: usize },
    Vwap,
}

impl IndicatorKind {
    /// Candles needed before the first output point exists.
    pub fn min_candles(&self) -> usize {
        match *self {
            IndicatorKind::Sma { period }
            | IndicatorKind::Ema { period }
            | IndicatorKind::Bollinger { period, .. } => period,
            IndicatorKind::Rsi { period } | IndicatorKind::Atr { period } => period + 1,
            IndicatorKind::Macd { fast, slow, signal } => {
                (fast.max(slow) + signal).saturating_sub(1)
            }
            IndicatorKind::Stochastic { k_period, d_period } => {
                (k_period + d_period).saturating_sub(1)
            }
            IndicatorKind::Vwap => 1,
        }
    }

    pub fn validate(&self) -> Result<(), RuletraderError> {
        let positive = |name: &str, value: usize| {
            if value == 0 {
                Err(RuletraderError::validation(
                    format!("{} {}", self.name(), name),
                    "must be at least 1",
                ))
            } else {
                Ok(())
            }
        };

        match *self {
            IndicatorKind::Sma { period }
            | IndicatorKind::Ema { period }
            | IndicatorKind::Rsi { period }
            | IndicatorKind::Atr { period } => positive("period", period),
            IndicatorKind::Macd { fast, slow, signal } => {
                positive("fast", fast)?;
                positive("slow", slow)?;
                positive("signal", signal)?;
                if fast >= slow {
                    return Err(RuletraderError::validation(
                        "MACD fast",
                        format!("fast period ({fast}) must be shorter than slow period ({slow})"),
                    ));
                }
                Ok(())
            }
            IndicatorKind::Bollinger { period, k } => {
                positive("period", period)?;
                if !k.is_finite() || k <= 0.0 {
                    return Err(RuletraderError::validation(
                        "BOLLINGER k",
                        "band multiplier must be a positive number",
                    ));
                }
                Ok(())
            }
            IndicatorKind::Stochastic { k_period, d_period } => {
                positive("k_period", k_period)?;
                positive("d_period", d_period)
            }
            IndicatorKind::Vwap => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::Sma { .. } => "SMA",
            IndicatorKind::Ema { .. } => "EMA",
            IndicatorKind::Rsi { .. } => "RSI",
            IndicatorKind::Macd { .. } => "MACD",
            IndicatorKind::Bollinger { .. } => "BOLLINGER",
            IndicatorKind::Stochastic { .. } => "STOCHASTIC",
            IndicatorKind::Atr { .. } => "ATR",
            IndicatorKind::Vwap => "VWAP",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma { period } => write!(f, "SMA({})", period),
            IndicatorKind::Ema { period } => write!(f, "EMA({})", period),
            IndicatorKind::Rsi { period } => write!(f, "RSI({})", period),
            IndicatorKind::Atr { period } => write!(f, "ATR({})", period),
            IndicatorKind::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorKind::Bollinger { period, k } => write!(f, "BOLLINGER({},{})", period, k),
            IndicatorKind::Stochastic { k_period, d_period } => {
                write!(f, "STOCHASTIC({},{})", k_period, d_period)
            }
            IndicatorKind::Vwap => write!(f, "VWAP"),
        }
    }
}

/// An indicator bound to the key that rules reference it by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub key: String,
    #[serde(flatten)]
    pub kind: IndicatorKind,
}

impl IndicatorConfig {
    pub fn new(key: impl Into<String>, kind: IndicatorKind) -> Self {
        Self {
            key: key.into(),
            kind,
        }
    }

    pub fn validate(&self) -> Result<(), RuletraderError> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err(RuletraderError::validation(
                "indicator key",
                "must not be empty",
            ));
        }
        if key.contains('.') || key.contains(char::is_whitespace) {
            return Err(RuletraderError::validation(
                "indicator key",
                format!("'{}' must not contain '.' or whitespace", self.key),
            ));
        }
        self.kind.validate()
    }
}

/// Output of one indicator. `points[j]` belongs to candle `offset + j`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub offset: usize,
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn empty(kind: IndicatorKind) -> Self {
        Self {
            kind,
            offset: 0,
            points: Vec::new(),
        }
    }

    /// Build a series whose first value belongs to `candles[offset]`.
    pub(crate) fn aligned(
        kind: IndicatorKind,
        candles: &[Candle],
        offset: usize,
        values: Vec<IndicatorValue>,
    ) -> Self {
        let points = candles[offset..]
            .iter()
            .zip(values)
            .map(|(candle, value)| IndicatorPoint {
                time: candle.time,
                value,
            })
            .collect();
        Self {
            kind,
            offset,
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value belonging to the candle at `index`, if the series covers it.
    pub fn value_at(&self, index: usize) -> Option<&IndicatorValue> {
        index
            .checked_sub(self.offset)
            .and_then(|j| self.points.get(j))
            .map(|p| &p.value)
    }
}

/// Indicator series keyed by the field key rules use.
pub type IndicatorSet = HashMap<String, IndicatorSeries>;

pub fn compute(kind: &IndicatorKind, candles: &[Candle]) -> IndicatorSeries {
    match *kind {
        IndicatorKind::Sma { period } => sma::calculate_sma(candles, period),
        IndicatorKind::Ema { period } => ema::calculate_ema(candles, period),
        IndicatorKind::Rsi { period } => rsi::calculate_rsi(candles, period),
        IndicatorKind::Macd { fast, slow, signal } => {
            macd::calculate_macd(candles, fast, slow, signal)
        }
        IndicatorKind::Bollinger { period, k } => bollinger::calculate_bollinger(candles, period, k),
        IndicatorKind::Stochastic { k_period, d_period } => {
            stochastic::calculate_stochastic(candles, k_period, d_period)
        }
        IndicatorKind::Atr { period } => atr::calculate_atr(candles, period),
        IndicatorKind::Vwap => vwap::calculate_vwap(candles),
    }
}

pub fn compute_all(configs: &[IndicatorConfig], candles: &[Candle]) -> IndicatorSet {
    configs
        .iter()
        .map(|config| (config.key.clone(), compute(&config.kind, candles)))
        .collect()
}

/// Trailing arithmetic means; element `j` covers `values[j..j + period]`.
pub(crate) fn sma_values(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|window| window.iter().sum::<f64>() / period as f64)
        .collect()
}

/// EMA seeded with the SMA of the first `period` values; element `j`
/// belongs to `values[j + period - 1]`.
pub(crate) fn ema_values(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(ema);
    for &value in &values[period..] {
        ema = (value - ema) * multiplier + ema;
        out.push(ema);
    }
    out
}
