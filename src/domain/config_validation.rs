//! Configuration validation for strategy and runtime INI files.
//!
//! Checks presence and shape of keys before anything is built from them.
//! Semantic checks on the built strategy live in `StrategyConfig::validate`.

use chrono::{DateTime, Utc};

use crate::domain::candle::parse_timestamp;
use crate::domain::error::RuletraderError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_TICK_INTERVAL_SECS: i64 = 60;
pub const DEFAULT_PAIR_TIMEOUT_MS: i64 = 5_000;
pub const DEFAULT_TICK_DEADLINE_MS: i64 = 30_000;
pub const DEFAULT_MAX_CONCURRENCY: i64 = 8;
pub const DEFAULT_WARMUP_BUFFER: i64 = 10;

pub fn validate_strategy_sections(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    for key in ["name", "symbols", "entry_rules"] {
        config.require_string("strategy", key)?;
    }
    config.require_f64("strategy", "position_size")?;
    config.require_f64("strategy", "max_drawdown")?;
    config.get_f64_opt("strategy", "stop_loss")?;
    config.get_f64_opt("strategy", "take_profit")?;
    validate_indicator_section(config)
}

pub fn validate_runtime_config(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    validate_initial_capital(config)?;
    validate_window(config)?;
    validate_positive_int(config, "live", "tick_interval_secs", DEFAULT_TICK_INTERVAL_SECS)?;
    validate_positive_int(config, "live", "pair_timeout_ms", DEFAULT_PAIR_TIMEOUT_MS)?;
    validate_positive_int(config, "live", "tick_deadline_ms", DEFAULT_TICK_DEADLINE_MS)?;
    validate_positive_int(config, "live", "max_concurrency", DEFAULT_MAX_CONCURRENCY)?;
    validate_non_negative_int(config, "live", "warmup_buffer", DEFAULT_WARMUP_BUFFER)?;
    Ok(())
}

fn validate_indicator_section(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    let keys = config.keys("indicators");
    if keys.is_empty() {
        return Err(RuletraderError::ConfigMissing {
            section: "indicators".to_string(),
            key: "<any>".to_string(),
        });
    }
    for key in keys {
        config.require_string("indicators", &key)?;
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    let value = config
        .get_f64_opt("backtest", "initial_capital")?
        .unwrap_or(DEFAULT_INITIAL_CAPITAL);
    if !value.is_finite() || value <= 0.0 {
        return Err(RuletraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    let start = config_time(config, "backtest", "start")?;
    let end = config_time(config, "backtest", "end")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(RuletraderError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "start".to_string(),
                reason: "start must be before end".to_string(),
            });
        }
    }
    Ok(())
}

/// Read an optional timestamp key; present but unparseable is an error.
pub fn config_time(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<DateTime<Utc>>, RuletraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| RuletraderError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("'{raw}' is not a date or timestamp"),
            }),
    }
}

fn validate_positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<(), RuletraderError> {
    if read_int(config, section, key, default)? < 1 {
        return Err(RuletraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be at least 1"),
        });
    }
    Ok(())
}

fn validate_non_negative_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<(), RuletraderError> {
    if read_int(config, section, key, default)? < 0 {
        return Err(RuletraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be non-negative"),
        });
    }
    Ok(())
}

/// Integer with a default when absent; a present non-integer is an error.
pub fn read_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, RuletraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|e| RuletraderError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("'{raw}' is not an integer: {e}"),
            }),
    }
}
