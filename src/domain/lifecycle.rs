//! Strategy lifecycle states and the domain events transitions emit.
//!
//! ```text
//! DRAFT ──start_backtest──▶ BACKTESTING ──complete──▶ BACKTEST_PASSED ──activate──▶ ACTIVE
//!   ▲                          │                                                   │  ▲
//!   │                          └──complete/fail──▶ BACKTEST_FAILED                 │  │
//!   │                                                 │                         pause activate
//!   └──────────────(start_backtest)───────────────────┘                            ▼  │
//!                                                                                 PAUSED
//! ACTIVE | PAUSED ──stop──▶ STOPPED (terminal)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::RuletraderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyStatus {
    Draft,
    Backtesting,
    BacktestPassed,
    BacktestFailed,
    Active,
    Paused,
    Stopped,
}

impl StrategyStatus {
    pub const ALL: [StrategyStatus; 7] = [
        StrategyStatus::Draft,
        StrategyStatus::Backtesting,
        StrategyStatus::BacktestPassed,
        StrategyStatus::BacktestFailed,
        StrategyStatus::Active,
        StrategyStatus::Paused,
        StrategyStatus::Stopped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyStatus::Draft => "DRAFT",
            StrategyStatus::Backtesting => "BACKTESTING",
            StrategyStatus::BacktestPassed => "BACKTEST_PASSED",
            StrategyStatus::BacktestFailed => "BACKTEST_FAILED",
            StrategyStatus::Active => "ACTIVE",
            StrategyStatus::Paused => "PAUSED",
            StrategyStatus::Stopped => "STOPPED",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StrategyStatus::Stopped)
    }

    /// Configuration may be edited in every status except `ACTIVE`.
    pub fn allows_configuration_change(&self) -> bool {
        !matches!(self, StrategyStatus::Active)
    }
}

impl fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyStatus {
    type Err = RuletraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        StrategyStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                RuletraderError::validation("strategy status", format!("unknown status '{s}'"))
            })
    }
}

/// Emitted by the `Strategy` aggregate on every successful transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StrategyEvent {
    Created {
        strategy_id: String,
        owner_id: String,
        at: DateTime<Utc>,
    },
    BacktestStarted {
        strategy_id: String,
        at: DateTime<Utc>,
    },
    BacktestCompleted {
        strategy_id: String,
        passed: bool,
        total_trades: usize,
        profitability: f64,
        at: DateTime<Utc>,
    },
    BacktestFailed {
        strategy_id: String,
        reason: String,
        at: DateTime<Utc>,
    },
    Activated {
        strategy_id: String,
        at: DateTime<Utc>,
    },
    Paused {
        strategy_id: String,
        at: DateTime<Utc>,
    },
    Stopped {
        strategy_id: String,
        at: DateTime<Utc>,
    },
    /// `backtest_stale` is set when the edit lands in a status that can still
    /// be activated on the strength of the previous verdict.
    ConfigurationUpdated {
        strategy_id: String,
        backtest_stale: bool,
        at: DateTime<Utc>,
    },
}

impl StrategyEvent {
    pub fn strategy_id(&self) -> &str {
        match self {
            StrategyEvent::Created { strategy_id, .. }
            | StrategyEvent::BacktestStarted { strategy_id, .. }
            | StrategyEvent::BacktestCompleted { strategy_id, .. }
            | StrategyEvent::BacktestFailed { strategy_id, .. }
            | StrategyEvent::Activated { strategy_id, .. }
            | StrategyEvent::Paused { strategy_id, .. }
            | StrategyEvent::Stopped { strategy_id, .. }
            | StrategyEvent::ConfigurationUpdated { strategy_id, .. } => strategy_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StrategyEvent::Created { .. } => "created",
            StrategyEvent::BacktestStarted { .. } => "backtest_started",
            StrategyEvent::BacktestCompleted { .. } => "backtest_completed",
            StrategyEvent::BacktestFailed { .. } => "backtest_failed",
            StrategyEvent::Activated { .. } => "activated",
            StrategyEvent::Paused { .. } => "paused",
            StrategyEvent::Stopped { .. } => "stopped",
            StrategyEvent::ConfigurationUpdated { .. } => "configuration_updated",
        }
    }
}
