//! Outbound entry signals produced by live evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::position::{stop_loss_price, take_profit_price};
use crate::domain::strategy::RiskParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("buy"),
        }
    }
}

/// Sizing derived the same way the simulator sizes an entry. Turning the
/// percentage into a quantity is left to the order sink, which knows the
/// account balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizingHint {
    pub position_size_percent: f64,
    pub reference_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
}

impl SizingHint {
    pub fn from_risk(risk: &RiskParameters, reference_price: f64) -> Self {
        Self {
            position_size_percent: risk.position_size_percent,
            reference_price,
            stop_loss: risk
                .stop_loss_percent
                .map(|pct| stop_loss_price(reference_price, pct)),
            take_profit: risk
                .take_profit_percent
                .map(|pct| take_profit_price(reference_price, pct)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundSignal {
    pub strategy_id: String,
    pub symbol: String,
    pub side: Side,
    pub sizing: SizingHint,
    pub generated_at: DateTime<Utc>,
}

impl OutboundSignal {
    pub fn entry(
        strategy_id: impl Into<String>,
        symbol: impl Into<String>,
        risk: &RiskParameters,
        reference_price: f64,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            symbol: symbol.into(),
            side: Side::Buy,
            sizing: SizingHint::from_risk(risk, reference_price),
            generated_at,
        }
    }
}
