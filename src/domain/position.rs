//! Simulated long positions and the trades they close into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    ExitSignal,
    EndOfWindow,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::ExitSignal => "exit_signal",
            ExitReason::EndOfWindow => "end_of_window",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub entry_price: f64,
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl Position {
    /// Open a position worth `notional` at `price`, deriving the protective
    /// levels from the optional percentages.
    pub fn open(
        symbol: impl Into<String>,
        price: f64,
        notional: f64,
        time: DateTime<Utc>,
        stop_loss_percent: Option<f64>,
        take_profit_percent: Option<f64>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            entry_price: price,
            quantity: notional / price,
            entry_time: time,
            stop_loss: stop_loss_percent.map(|pct| stop_loss_price(price, pct)),
            take_profit: take_profit_percent.map(|pct| take_profit_price(price, pct)),
        }
    }

    pub fn notional(&self) -> f64 {
        self.quantity * self.entry_price
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        self.stop_loss.is_some_and(|level| price <= level)
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        self.take_profit.is_some_and(|level| price >= level)
    }

    pub fn close(self, price: f64, time: DateTime<Utc>, reason: ExitReason) -> Trade {
        let profit = self.quantity * (price - self.entry_price);
        let profit_percent = (price - self.entry_price) / self.entry_price * 100.0;
        Trade {
            symbol: self.symbol,
            entry_price: self.entry_price,
            exit_price: price,
            quantity: self.quantity,
            profit,
            profit_percent,
            entry_time: self.entry_time,
            exit_time: time,
            exit_reason: reason,
        }
    }
}

pub fn stop_loss_price(entry: f64, percent: f64) -> f64 {
    entry * (1.0 - percent / 100.0)
}

pub fn take_profit_price(entry: f64, percent: f64) -> f64 {
    entry * (1.0 + percent / 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub symbol: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub profit: f64,
    pub profit_percent: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn proceeds(&self) -> f64 {
        self.quantity * self.exit_price
    }

    pub fn is_winner(&self) -> bool {
        self.profit > 0.0
    }
}
