//! Strategy configuration and the `Strategy` aggregate.
//!
//! A `Strategy` can only be built from a configuration that passed
//! validation, and it only changes through the lifecycle methods below. Each
//! successful transition stamps `updated_at` and queues a `StrategyEvent`
//! that the owning service drains with [`Strategy::take_events`].

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::RuletraderError;
use crate::domain::indicator::IndicatorConfig;
use crate::domain::lifecycle::{StrategyEvent, StrategyStatus};
use crate::domain::rule::RuleSet;

pub const MIN_NAME_LEN: usize = 3;
pub const MAX_PERCENT: f64 = 100.0;
pub const MAX_TAKE_PROFIT_PERCENT: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    TrendFollowing,
    MeanReversion,
    Momentum,
    Breakout,
    Custom,
}

impl StrategyType {
    pub const ALL: [StrategyType; 5] = [
        StrategyType::TrendFollowing,
        StrategyType::MeanReversion,
        StrategyType::Momentum,
        StrategyType::Breakout,
        StrategyType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyType::TrendFollowing => "trend_following",
            StrategyType::MeanReversion => "mean_reversion",
            StrategyType::Momentum => "momentum",
            StrategyType::Breakout => "breakout",
            StrategyType::Custom => "custom",
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyType {
    type Err = RuletraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        StrategyType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| RuletraderError::validation("strategy type", format!("unknown type '{s}'")))
    }
}

/// Candle interval a strategy trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 8] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::M1 => Duration::minutes(1),
            Timeframe::M5 => Duration::minutes(5),
            Timeframe::M15 => Duration::minutes(15),
            Timeframe::M30 => Duration::minutes(30),
            Timeframe::H1 => Duration::hours(1),
            Timeframe::H4 => Duration::hours(4),
            Timeframe::D1 => Duration::days(1),
            Timeframe::W1 => Duration::weeks(1),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = RuletraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                RuletraderError::validation(
                    "timeframe",
                    format!("unknown timeframe '{s}' (expected one of 1m, 5m, 15m, 30m, 1h, 4h, 1d, 1w)"),
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskParameters {
    pub position_size_percent: f64,
    pub max_drawdown_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit_percent: Option<f64>,
}

impl RiskParameters {
    pub fn validate(&self) -> Result<(), RuletraderError> {
        check_percent("positionSizePercent", self.position_size_percent, MAX_PERCENT)?;
        check_percent("maxDrawdownPercent", self.max_drawdown_percent, MAX_PERCENT)?;
        if let Some(stop_loss) = self.stop_loss_percent {
            check_percent("stopLossPercent", stop_loss, MAX_PERCENT)?;
        }
        if let Some(take_profit) = self.take_profit_percent {
            check_percent("takeProfitPercent", take_profit, MAX_TAKE_PROFIT_PERCENT)?;
        }
        Ok(())
    }
}

/// Rejects NaN along with anything outside `(0, max]`.
fn check_percent(field: &str, value: f64, max: f64) -> Result<(), RuletraderError> {
    if value > 0.0 && value <= max {
        Ok(())
    } else {
        Err(RuletraderError::validation(
            field,
            format!("{value} is outside (0, {max}]"),
        ))
    }
}

/// Everything a user may edit while the strategy is not live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub strategy_type: StrategyType,
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub indicators: Vec<IndicatorConfig>,
    pub rules: RuleSet,
    pub risk: RiskParameters,
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), RuletraderError> {
        if self.name.trim().chars().count() < MIN_NAME_LEN {
            return Err(RuletraderError::validation(
                "name",
                format!("must be at least {MIN_NAME_LEN} characters"),
            ));
        }

        if self.symbols.is_empty() {
            return Err(RuletraderError::validation(
                "symbols",
                "at least one symbol is required",
            ));
        }
        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            let symbol = symbol.trim();
            if symbol.is_empty() {
                return Err(RuletraderError::validation("symbols", "symbol must not be empty"));
            }
            if !seen.insert(symbol) {
                return Err(RuletraderError::validation(
                    "symbols",
                    format!("duplicate symbol '{symbol}'"),
                ));
            }
        }

        let mut keys = HashSet::new();
        for indicator in &self.indicators {
            indicator.validate()?;
            if !keys.insert(indicator.key.trim()) {
                return Err(RuletraderError::validation(
                    "indicators",
                    format!("duplicate indicator key '{}'", indicator.key),
                ));
            }
        }

        self.rules.validate()?;
        self.risk.validate()
    }

    /// Candles needed before every configured indicator has a value.
    pub fn required_candles(&self) -> usize {
        self.indicators
            .iter()
            .map(|indicator| indicator.kind.min_candles())
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// Rule keys with no matching indicator; such rules always evaluate false.
    pub fn unresolved_rule_keys(&self) -> Vec<&str> {
        self.rules
            .referenced_keys()
            .into_iter()
            .filter(|key| !self.indicators.iter().any(|i| i.key.trim() == *key))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StrategyRecord")]
pub struct Strategy {
    id: String,
    owner_id: String,
    #[serde(flatten)]
    config: StrategyConfig,
    status: StrategyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    backtest_results: Option<BacktestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_backtested_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reconfigured_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    activated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stopped_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
    #[serde(skip)]
    pending_events: Vec<StrategyEvent>,
}

/// Persisted shape of a `Strategy`; converting back re-runs validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StrategyRecord {
    id: String,
    owner_id: String,
    #[serde(flatten)]
    config: StrategyConfig,
    status: StrategyStatus,
    #[serde(default)]
    backtest_results: Option<BacktestResult>,
    #[serde(default)]
    last_backtested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    reconfigured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    activated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    stopped_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    version: u64,
}

impl TryFrom<StrategyRecord> for Strategy {
    type Error = RuletraderError;

    fn try_from(record: StrategyRecord) -> Result<Self, Self::Error> {
        if record.id.trim().is_empty() {
            return Err(RuletraderError::validation("id", "must not be empty"));
        }
        record.config.validate()?;
        Ok(Strategy {
            id: record.id,
            owner_id: record.owner_id,
            config: record.config,
            status: record.status,
            backtest_results: record.backtest_results,
            last_backtested_at: record.last_backtested_at,
            reconfigured_at: record.reconfigured_at,
            activated_at: record.activated_at,
            stopped_at: record.stopped_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
            pending_events: Vec::new(),
        })
    }
}

impl Strategy {
    /// Create a `DRAFT` strategy with a fresh id.
    pub fn new(
        owner_id: impl Into<String>,
        config: StrategyConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, RuletraderError> {
        Self::with_id(Uuid::new_v4().to_string(), owner_id, config, now)
    }

    pub fn with_id(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        config: StrategyConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, RuletraderError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RuletraderError::validation("id", "must not be empty"));
        }
        config.validate()?;
        let owner_id = owner_id.into();
        let created = StrategyEvent::Created {
            strategy_id: id.clone(),
            owner_id: owner_id.clone(),
            at: now,
        };
        Ok(Strategy {
            id,
            owner_id,
            config,
            status: StrategyStatus::Draft,
            backtest_results: None,
            last_backtested_at: None,
            reconfigured_at: None,
            activated_at: None,
            stopped_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
            pending_events: vec![created],
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn status(&self) -> StrategyStatus {
        self.status
    }

    pub fn symbols(&self) -> &[String] {
        &self.config.symbols
    }

    pub fn timeframe(&self) -> Timeframe {
        self.config.timeframe
    }

    pub fn indicators(&self) -> &[IndicatorConfig] {
        &self.config.indicators
    }

    pub fn rules(&self) -> &RuleSet {
        &self.config.rules
    }

    pub fn risk(&self) -> &RiskParameters {
        &self.config.risk
    }

    pub fn backtest_results(&self) -> Option<&BacktestResult> {
        self.backtest_results.as_ref()
    }

    pub fn last_backtested_at(&self) -> Option<DateTime<Utc>> {
        self.last_backtested_at
    }

    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
    }

    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.stopped_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Version last persisted; 0 for a strategy never saved.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Called by repositories after a successful save.
    pub fn record_saved(&mut self, version: u64) {
        self.version = version;
    }

    pub fn required_candles(&self) -> usize {
        self.config.required_candles()
    }

    pub fn pending_events(&self) -> &[StrategyEvent] {
        &self.pending_events
    }

    pub fn take_events(&mut self) -> Vec<StrategyEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// `DRAFT | BACKTEST_FAILED -> BACKTESTING`
    pub fn start_backtest(&mut self, now: DateTime<Utc>) -> Result<(), RuletraderError> {
        self.require(
            &[StrategyStatus::Draft, StrategyStatus::BacktestFailed],
            "start backtest for",
        )?;
        self.status = StrategyStatus::Backtesting;
        self.touch(
            StrategyEvent::BacktestStarted {
                strategy_id: self.id.clone(),
                at: now,
            },
            now,
        );
        Ok(())
    }

    /// `BACKTESTING -> BACKTEST_PASSED | BACKTEST_FAILED`; returns whether
    /// the result met the acceptance thresholds.
    pub fn complete_backtest(
        &mut self,
        results: BacktestResult,
        now: DateTime<Utc>,
    ) -> Result<bool, RuletraderError> {
        self.require(&[StrategyStatus::Backtesting], "complete backtest for")?;
        let passed = results.passes(self.config.risk.max_drawdown_percent);
        self.status = if passed {
            StrategyStatus::BacktestPassed
        } else {
            StrategyStatus::BacktestFailed
        };
        let event = StrategyEvent::BacktestCompleted {
            strategy_id: self.id.clone(),
            passed,
            total_trades: results.total_trades,
            profitability: results.profitability,
            at: now,
        };
        self.backtest_results = Some(results);
        self.last_backtested_at = Some(now);
        self.touch(event, now);
        Ok(passed)
    }

    /// `BACKTESTING -> BACKTEST_FAILED`, recording a sentinel result that
    /// carries `reason`.
    pub fn fail_backtest(
        &mut self,
        reason: impl Into<String>,
        initial_capital: f64,
        now: DateTime<Utc>,
    ) -> Result<(), RuletraderError> {
        self.require(&[StrategyStatus::Backtesting], "fail backtest for")?;
        let reason = reason.into();
        self.status = StrategyStatus::BacktestFailed;
        self.backtest_results = Some(BacktestResult::failed(initial_capital, reason.clone()));
        self.last_backtested_at = Some(now);
        self.touch(
            StrategyEvent::BacktestFailed {
                strategy_id: self.id.clone(),
                reason,
                at: now,
            },
            now,
        );
        Ok(())
    }

    /// `BACKTEST_PASSED | PAUSED -> ACTIVE`
    pub fn activate(&mut self, now: DateTime<Utc>) -> Result<(), RuletraderError> {
        self.require(
            &[StrategyStatus::BacktestPassed, StrategyStatus::Paused],
            "activate",
        )?;
        self.status = StrategyStatus::Active;
        self.activated_at = Some(now);
        self.stopped_at = None;
        self.touch(
            StrategyEvent::Activated {
                strategy_id: self.id.clone(),
                at: now,
            },
            now,
        );
        Ok(())
    }

    /// `ACTIVE -> PAUSED`
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), RuletraderError> {
        self.require(&[StrategyStatus::Active], "pause")?;
        self.status = StrategyStatus::Paused;
        self.touch(
            StrategyEvent::Paused {
                strategy_id: self.id.clone(),
                at: now,
            },
            now,
        );
        Ok(())
    }

    /// `ACTIVE | PAUSED -> STOPPED`
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<(), RuletraderError> {
        self.require(&[StrategyStatus::Active, StrategyStatus::Paused], "stop")?;
        self.status = StrategyStatus::Stopped;
        self.stopped_at = Some(now);
        self.touch(
            StrategyEvent::Stopped {
                strategy_id: self.id.clone(),
                at: now,
            },
            now,
        );
        Ok(())
    }

    /// Replace the configuration; refused while `ACTIVE`. Status is unchanged,
    /// so an edit after a passing backtest leaves the verdict stale.
    pub fn update_configuration(
        &mut self,
        config: StrategyConfig,
        now: DateTime<Utc>,
    ) -> Result<(), RuletraderError> {
        if !self.status.allows_configuration_change() {
            return Err(RuletraderError::InvalidTransition {
                status: self.status,
                operation: "update configuration of",
            });
        }
        config.validate()?;
        self.config = config;
        self.reconfigured_at = Some(now);
        self.touch(
            StrategyEvent::ConfigurationUpdated {
                strategy_id: self.id.clone(),
                backtest_stale: self.backtest_is_stale(),
                at: now,
            },
            now,
        );
        Ok(())
    }

    /// True when the stored verdict no longer describes the configuration
    /// but the status still permits activation.
    pub fn backtest_is_stale(&self) -> bool {
        matches!(
            self.status,
            StrategyStatus::BacktestPassed | StrategyStatus::Paused
        ) && match (self.reconfigured_at, self.last_backtested_at) {
            (Some(edited), Some(tested)) => edited >= tested,
            _ => false,
        }
    }

    fn require(
        &self,
        allowed: &[StrategyStatus],
        operation: &'static str,
    ) -> Result<(), RuletraderError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(RuletraderError::InvalidTransition {
                status: self.status,
                operation,
            })
        }
    }

    fn touch(&mut self, event: StrategyEvent, now: DateTime<Utc>) {
        self.updated_at = now;
        self.pending_events.push(event);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::sma_config;
    use super::*;
    use crate::domain::indicator::IndicatorKind;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn later(minutes: i64) -> DateTime<Utc> {
        now() + Duration::minutes(minutes)
    }

    fn draft() -> Strategy {
        Strategy::with_id("s-1", "owner-1", sma_config(), now()).unwrap()
    }

    fn result(profitability: f64, win_rate: f64, max_drawdown: f64) -> BacktestResult {
        BacktestResult {
            initial_capital: 10_000.0,
            final_capital: 10_000.0 * (1.0 + profitability / 100.0),
            total_trades: 10,
            winning_trades: (win_rate / 10.0) as usize,
            losing_trades: 10 - (win_rate / 10.0) as usize,
            win_rate,
            profitability,
            max_drawdown,
            trades: Vec::new(),
            error: None,
        }
    }

    fn passed() -> Strategy {
        let mut s = draft();
        s.start_backtest(later(1)).unwrap();
        assert!(s.complete_backtest(result(5.0, 60.0, 10.0), later(2)).unwrap());
        s
    }

    fn err_status(err: RuletraderError) -> StrategyStatus {
        match err {
            RuletraderError::InvalidTransition { status, .. } => status,
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn new_strategy_is_draft_with_created_event() {
        let mut s = Strategy::new("owner-1", sma_config(), now()).unwrap();
        assert_eq!(s.status(), StrategyStatus::Draft);
        assert!(!s.id().is_empty());
        assert_eq!(s.version(), 0);
        assert_eq!(s.created_at(), s.updated_at());
        let events = s.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "created");
        assert!(s.take_events().is_empty());
    }

    #[test]
    fn name_must_have_three_characters() {
        let mut config = sma_config();
        config.name = "ab".into();
        assert!(Strategy::new("o", config.clone(), now()).is_err());
        config.name = "abc".into();
        assert!(Strategy::new("o", config, now()).is_ok());
    }

    #[test]
    fn symbols_must_be_present_and_unique() {
        let mut config = sma_config();
        config.symbols.clear();
        assert!(config.validate().is_err());

        config.symbols = vec!["BTC".into(), " ".into()];
        assert!(config.validate().is_err());

        config.symbols = vec!["BTC".into(), "BTC".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn percentages_must_be_in_range() {
        let cases: [(fn(&mut RiskParameters), bool); 8] = [
            (|r| r.position_size_percent = 0.0, false),
            (|r| r.position_size_percent = 100.0, true),
            (|r| r.position_size_percent = 100.5, false),
            (|r| r.max_drawdown_percent = f64::NAN, false),
            (|r| r.stop_loss_percent = Some(-1.0), false),
            (|r| r.stop_loss_percent = Some(5.0), true),
            (|r| r.take_profit_percent = Some(1000.0), true),
            (|r| r.take_profit_percent = Some(1000.1), false),
        ];
        for (i, (mutate, ok)) in cases.into_iter().enumerate() {
            let mut config = sma_config();
            mutate(&mut config.risk);
            assert_eq!(config.validate().is_ok(), ok, "case {i}");
        }
    }

    #[test]
    fn indicator_keys_must_be_unique_and_valid() {
        let mut config = sma_config();
        config
            .indicators
            .push(IndicatorConfig::new("sma", IndicatorKind::Ema { period: 5 }));
        assert!(config.validate().is_err());

        let mut config = sma_config();
        config.indicators[0].kind = IndicatorKind::Sma { period: 0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_entry_rules_rejected() {
        let mut config = sma_config();
        config.rules.entry.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unresolved_rule_keys_reported() {
        let mut config = sma_config();
        assert!(config.unresolved_rule_keys().is_empty());
        config.rules.exit.push(
            crate::domain::rule::Rule::new("rsi", crate::domain::rule::RuleOperator::GreaterThan, 70.0)
                .unwrap(),
        );
        assert_eq!(config.unresolved_rule_keys(), vec!["rsi"]);
    }

    #[test]
    fn required_candles_is_longest_warmup() {
        let mut config = sma_config();
        assert_eq!(config.required_candles(), 3);
        config.indicators.push(IndicatorConfig::new(
            "macd",
            IndicatorKind::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
            },
        ));
        assert_eq!(config.required_candles(), 34);
        config.indicators.clear();
        assert_eq!(config.required_candles(), 1);
    }

    #[test]
    fn activate_from_draft_is_rejected() {
        let mut s = draft();
        let err = s.activate(later(1)).unwrap_err();
        assert_eq!(err_status(err), StrategyStatus::Draft);
        assert_eq!(s.status(), StrategyStatus::Draft);
        assert!(s.activated_at().is_none());
    }

    #[test]
    fn activate_from_passed_sets_activated_at() {
        let mut s = passed();
        s.activate(later(3)).unwrap();
        assert_eq!(s.status(), StrategyStatus::Active);
        assert_eq!(s.activated_at(), Some(later(3)));
        assert_eq!(s.updated_at(), later(3));
    }

    #[test]
    fn complete_backtest_records_results_either_way() {
        let s = passed();
        assert_eq!(s.status(), StrategyStatus::BacktestPassed);
        assert_eq!(s.last_backtested_at(), Some(later(2)));
        assert!(s.backtest_results().is_some());

        for bad in [
            result(0.0, 60.0, 10.0),  // not profitable
            result(5.0, 39.9, 10.0),  // win rate too low
            result(5.0, 60.0, 25.01), // drawdown above the 25% limit
        ] {
            let mut s = draft();
            s.start_backtest(later(1)).unwrap();
            assert!(!s.complete_backtest(bad.clone(), later(2)).unwrap());
            assert_eq!(s.status(), StrategyStatus::BacktestFailed);
            assert_eq!(s.backtest_results(), Some(&bad));
            assert_eq!(s.last_backtested_at(), Some(later(2)));
        }
    }

    #[test]
    fn acceptance_thresholds_are_inclusive() {
        let mut s = draft();
        s.start_backtest(later(1)).unwrap();
        assert!(s.complete_backtest(result(0.01, 40.0, 25.0), later(2)).unwrap());
    }

    #[test]
    fn failed_backtest_can_be_retried() {
        let mut s = draft();
        s.start_backtest(later(1)).unwrap();
        s.fail_backtest("no candles for BTCUSDT", 10_000.0, later(2)).unwrap();
        assert_eq!(s.status(), StrategyStatus::BacktestFailed);

        let sentinel = s.backtest_results().unwrap();
        assert_eq!(sentinel.total_trades, 0);
        assert_eq!(sentinel.win_rate, 0.0);
        assert_eq!(sentinel.profitability, -100.0);
        assert_eq!(sentinel.error.as_deref(), Some("no candles for BTCUSDT"));

        s.start_backtest(later(3)).unwrap();
        assert_eq!(s.status(), StrategyStatus::Backtesting);
    }

    #[test]
    fn pause_resume_stop() {
        let mut s = passed();
        s.activate(later(3)).unwrap();
        s.pause(later(4)).unwrap();
        assert_eq!(s.status(), StrategyStatus::Paused);
        s.activate(later(5)).unwrap();
        assert_eq!(s.activated_at(), Some(later(5)));
        s.stop(later(6)).unwrap();
        assert_eq!(s.status(), StrategyStatus::Stopped);
        assert_eq!(s.stopped_at(), Some(later(6)));
    }

    #[test]
    fn stopped_is_terminal() {
        let mut s = passed();
        s.activate(later(3)).unwrap();
        s.stop(later(4)).unwrap();
        assert!(s.start_backtest(later(5)).is_err());
        assert!(s.activate(later(5)).is_err());
        assert!(s.pause(later(5)).is_err());
        assert!(s.stop(later(5)).is_err());
        assert_eq!(s.status(), StrategyStatus::Stopped);
    }

    #[test]
    fn transition_table() {
        // (status reached by setup, operations that must succeed from it)
        type Op = fn(&mut Strategy) -> Result<(), RuletraderError>;
        let ops: [(&str, Op); 4] = [
            ("start", |s| s.start_backtest(later(10))),
            ("activate", |s| s.activate(later(10))),
            ("pause", |s| s.pause(later(10))),
            ("stop", |s| s.stop(later(10))),
        ];
        let setups: [(StrategyStatus, fn() -> Strategy, &[&str]); 6] = [
            (StrategyStatus::Draft, draft, &["start"]),
            (
                StrategyStatus::Backtesting,
                || {
                    let mut s = draft();
                    s.start_backtest(later(1)).unwrap();
                    s
                },
                &[],
            ),
            (StrategyStatus::BacktestPassed, passed, &["activate"]),
            (
                StrategyStatus::BacktestFailed,
                || {
                    let mut s = draft();
                    s.start_backtest(later(1)).unwrap();
                    s.fail_backtest("boom", 1.0, later(2)).unwrap();
                    s
                },
                &["start"],
            ),
            (
                StrategyStatus::Active,
                || {
                    let mut s = passed();
                    s.activate(later(3)).unwrap();
                    s
                },
                &["pause", "stop"],
            ),
            (
                StrategyStatus::Paused,
                || {
                    let mut s = passed();
                    s.activate(later(3)).unwrap();
                    s.pause(later(4)).unwrap();
                    s
                },
                &["activate", "stop"],
            ),
        ];

        for (status, setup, allowed) in setups {
            for (name, op) in ops {
                let mut s = setup();
                assert_eq!(s.status(), status);
                let outcome = op(&mut s);
                assert_eq!(
                    outcome.is_ok(),
                    allowed.contains(&name),
                    "{name} from {status}"
                );
                if let Err(err) = outcome {
                    assert_eq!(err_status(err), status);
                    assert_eq!(s.status(), status);
                }
            }
        }
    }

    #[test]
    fn complete_and_fail_require_backtesting() {
        let mut s = draft();
        assert!(s.complete_backtest(result(5.0, 60.0, 1.0), later(1)).is_err());
        assert!(s.fail_backtest("x", 1.0, later(1)).is_err());
        assert!(s.backtest_results().is_none());
    }

    #[test]
    fn update_configuration_rejected_while_active() {
        let mut s = passed();
        s.activate(later(3)).unwrap();
        let mut config = sma_config();
        config.name = "Renamed".into();
        let err = s.update_configuration(config, later(4)).unwrap_err();
        assert_eq!(err_status(err), StrategyStatus::Active);
        assert_eq!(s.name(), "SMA breakout");
    }

    #[test]
    fn update_configuration_keeps_status() {
        let mut s = passed();
        s.activate(later(3)).unwrap();
        s.pause(later(4)).unwrap();

        let mut config = sma_config();
        config.symbols.push("ETHUSDT".into());
        s.update_configuration(config, later(5)).unwrap();
        assert_eq!(s.status(), StrategyStatus::Paused);
        assert_eq!(s.symbols().len(), 2);
        assert_eq!(s.updated_at(), later(5));
    }

    #[test]
    fn editing_a_passed_strategy_marks_the_verdict_stale() {
        let mut s = passed();
        assert!(!s.backtest_is_stale());
        s.take_events();

        let mut config = sma_config();
        config.name = "Retuned".into();
        s.update_configuration(config, later(3)).unwrap();
        assert_eq!(s.status(), StrategyStatus::BacktestPassed);
        assert!(s.backtest_is_stale());
        assert!(matches!(
            s.take_events().as_slice(),
            [StrategyEvent::ConfigurationUpdated { backtest_stale: true, .. }]
        ));
    }

    #[test]
    fn editing_a_draft_is_not_stale() {
        let mut s = draft();
        s.take_events();
        s.update_configuration(sma_config(), later(1)).unwrap();
        assert!(!s.backtest_is_stale());
        assert!(matches!(
            s.take_events().as_slice(),
            [StrategyEvent::ConfigurationUpdated { backtest_stale: false, .. }]
        ));
    }

    #[test]
    fn update_configuration_validates() {
        let mut s = draft();
        let mut config = sma_config();
        config.risk.position_size_percent = 150.0;
        assert!(matches!(
            s.update_configuration(config, later(1)),
            Err(RuletraderError::Validation { .. })
        ));
        assert_eq!(s.config(), &sma_config());
    }

    #[test]
    fn events_follow_transitions() {
        let mut s = passed();
        s.activate(later(3)).unwrap();
        let names: Vec<_> = s.take_events().iter().map(StrategyEvent::name).collect();
        assert_eq!(
            names,
            vec!["created", "backtest_started", "backtest_completed", "activated"]
        );
        assert!(s.take_events().is_empty());
    }

    #[test]
    fn serde_round_trip_preserves_state() {
        let mut s = passed();
        s.activate(later(3)).unwrap();
        s.record_saved(4);
        let json = serde_json::to_string(&s).unwrap();
        let back: Strategy = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), "s-1");
        assert_eq!(back.status(), StrategyStatus::Active);
        assert_eq!(back.config(), s.config());
        assert_eq!(back.activated_at(), Some(later(3)));
        assert_eq!(back.version(), 4);
        assert!(back.pending_events().is_empty());
    }

    #[test]
    fn deserialize_rejects_invalid_config() {
        let mut value = serde_json::to_value(draft()).unwrap();
        value["name"] = serde_json::json!("ab");
        let err = serde_json::from_value::<Strategy>(value).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn timeframe_parsing_and_duration() {
        assert_eq!("4h".parse::<Timeframe>().unwrap(), Timeframe::H4);
        assert_eq!("1D".parse::<Timeframe>().unwrap(), Timeframe::D1);
        assert!("2h".parse::<Timeframe>().is_err());
        assert_eq!(Timeframe::M15.duration(), Duration::minutes(15));
        assert_eq!(Timeframe::W1.duration(), Duration::days(7));
        assert_eq!(serde_json::to_string(&Timeframe::H1).unwrap(), "\"1h\"");
    }

    #[test]
    fn strategy_type_parsing() {
        assert_eq!(
            "mean-reversion".parse::<StrategyType>().unwrap(),
            StrategyType::MeanReversion
        );
        assert_eq!(
            "TREND_FOLLOWING".parse::<StrategyType>().unwrap(),
            StrategyType::TrendFollowing
        );
        assert!("scalping".parse::<StrategyType>().is_err());
    }
}
