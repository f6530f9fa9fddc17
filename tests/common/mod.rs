#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ruletrader::domain::backtest::BacktestResult;
use ruletrader::domain::candle::Candle;
use ruletrader::domain::error::RuletraderError;
use ruletrader::domain::indicator::{IndicatorConfig, IndicatorKind};
use ruletrader::domain::rule::RuleSet;
use ruletrader::domain::rule_parser::parse_rules;
use ruletrader::domain::strategy::{
    RiskParameters, Strategy, StrategyConfig, StrategyType, Timeframe,
};
use ruletrader::ports::data_port::CandleDataProvider;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct MockCandleProvider {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
    pub delay: Option<std::time::Duration>,
    pub requests: Mutex<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>,
}

impl MockCandleProvider {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<(String, DateTime<Utc>, DateTime<Utc>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CandleDataProvider for MockCandleProvider {
    async fn get_historical_candles(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, RuletraderError> {
        self.requests
            .lock()
            .unwrap()
            .push((symbol.to_string(), start, end));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RuletraderError::DataProvider {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Hourly candles from `t0()` with open = previous close and a one-point
/// range around the body.
pub fn hourly_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                time: t0() + Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

/// A linear ramp of `count` closes from `start` by `step`.
pub fn ramp(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

pub fn strategy_config(
    symbols: &[&str],
    indicators: &[(&str, IndicatorKind)],
    entry: &str,
    exit: &str,
) -> StrategyConfig {
    StrategyConfig {
        name: "Test strategy".into(),
        description: None,
        strategy_type: StrategyType::Custom,
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        timeframe: Timeframe::H1,
        indicators: indicators
            .iter()
            .map(|(key, kind)| IndicatorConfig::new(*key, kind.clone()))
            .collect(),
        rules: RuleSet::new(parse_rules(entry).unwrap(), parse_rules(exit).unwrap()),
        risk: RiskParameters {
            position_size_percent: 10.0,
            max_drawdown_percent: 25.0,
            stop_loss_percent: None,
            take_profit_percent: None,
        },
    }
}

/// SMA(3) breakout above 105 on BTCUSDT.
pub fn sma_breakout() -> StrategyConfig {
    strategy_config(
        &["BTCUSDT"],
        &[("sma", IndicatorKind::Sma { period: 3 })],
        "sma > 105",
        "",
    )
}

pub fn passing_result() -> BacktestResult {
    let mut result = BacktestResult::failed(10_000.0, "");
    result.error = None;
    result.final_capital = 10_500.0;
    result.profitability = 5.0;
    result.win_rate = 60.0;
    result
}

/// A strategy already walked to ACTIVE, as of `t0()`.
pub fn active_strategy(config: StrategyConfig) -> Strategy {
    let mut strategy = Strategy::new("owner-1", config, t0()).unwrap();
    strategy.start_backtest(t0()).unwrap();
    strategy.complete_backtest(passing_result(), t0()).unwrap();
    strategy.activate(t0()).unwrap();
    strategy.take_events();
    strategy
}
