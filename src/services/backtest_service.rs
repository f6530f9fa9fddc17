//! Runs a backtest for a stored strategy and records the verdict.
//!
//! Whatever goes wrong after `start_backtest` (candle fetch, bad data,
//! a panicking simulation) ends in `BACKTEST_FAILED` with the error kept in
//! the result, never in a strategy stuck at `BACKTESTING`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::domain::backtest::{BacktestResult, run_backtest};
use crate::domain::error::RuletraderError;
use crate::domain::lifecycle::StrategyStatus;
use crate::domain::strategy::Strategy;
use crate::ports::data_port::CandleDataProvider;
use crate::ports::event_port::EventPublisher;
use crate::ports::repository_port::StrategyRepository;
use crate::services::{load, persist};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub initial_capital: f64,
}

impl BacktestRequest {
    pub fn validate(&self) -> Result<(), RuletraderError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(RuletraderError::validation(
                "initial capital",
                format!("must be positive, got {}", self.initial_capital),
            ));
        }
        if self.start >= self.end {
            return Err(RuletraderError::validation(
                "backtest window",
                format!("start {} must be before end {}", self.start, self.end),
            ));
        }
        Ok(())
    }
}

pub struct BacktestService {
    repo: Arc<dyn StrategyRepository>,
    data: Arc<dyn CandleDataProvider>,
    events: Arc<dyn EventPublisher>,
}

impl BacktestService {
    pub fn new(
        repo: Arc<dyn StrategyRepository>,
        data: Arc<dyn CandleDataProvider>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self { repo, data, events }
    }

    /// Returns the strategy in `BACKTEST_PASSED` or `BACKTEST_FAILED`.
    pub async fn run(
        &self,
        strategy_id: &str,
        request: &BacktestRequest,
    ) -> Result<Strategy, RuletraderError> {
        request.validate()?;

        let mut strategy = load(self.repo.as_ref(), strategy_id).await?;
        strategy.start_backtest(Utc::now())?;
        persist(self.repo.as_ref(), self.events.as_ref(), &mut strategy).await?;
        info!(
            strategy_id,
            symbols = strategy.symbols().len(),
            start = %request.start,
            end = %request.end,
            "backtest started"
        );

        match self.simulate(&strategy, request).await {
            Ok(result) => {
                let trades = result.total_trades;
                let profitability = result.profitability;
                let passed = strategy.complete_backtest(result, Utc::now())?;
                info!(
                    strategy_id,
                    passed,
                    trades,
                    profitability,
                    "backtest completed"
                );
            }
            Err(e) => {
                warn!(strategy_id, error = %e, "backtest failed");
                strategy.fail_backtest(e.to_string(), request.initial_capital, Utc::now())?;
            }
        }

        if let Err(e) = persist(self.repo.as_ref(), self.events.as_ref(), &mut strategy).await {
            self.close_stranded(strategy_id, &e, request.initial_capital).await;
            return Err(e);
        }
        Ok(strategy)
    }

    /// Reloads a strategy whose verdict could not be saved and, if the stored
    /// copy is still `BACKTESTING`, fails it so a new run can start.
    async fn close_stranded(
        &self,
        strategy_id: &str,
        cause: &RuletraderError,
        initial_capital: f64,
    ) {
        let mut stored = match load(self.repo.as_ref(), strategy_id).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(strategy_id, error = %e, "could not reload strategy after failed save");
                return;
            }
        };
        if stored.status() != StrategyStatus::Backtesting {
            return;
        }
        let reason = format!("backtest result not saved: {cause}");
        let closed = match stored.fail_backtest(reason, initial_capital, Utc::now()) {
            Ok(()) => persist(self.repo.as_ref(), self.events.as_ref(), &mut stored).await,
            Err(e) => Err(e),
        };
        match closed {
            Ok(()) => warn!(strategy_id, error = %cause, "backtest verdict lost, marked failed"),
            Err(e) => error!(strategy_id, error = %e, "strategy left in BACKTESTING"),
        }
    }

    async fn simulate(
        &self,
        strategy: &Strategy,
        request: &BacktestRequest,
    ) -> Result<BacktestResult, RuletraderError> {
        let mut candles = HashMap::new();
        for symbol in strategy.symbols() {
            let series = self
                .data
                .get_historical_candles(symbol, strategy.timeframe(), request.start, request.end)
                .await?;
            if series.len() < strategy.required_candles() {
                warn!(
                    strategy_id = %strategy.id(),
                    symbol = %symbol,
                    candles = series.len(),
                    required = strategy.required_candles(),
                    "not enough candles for indicator warm-up"
                );
            }
            candles.insert(symbol.clone(), series);
        }

        let config = strategy.config().clone();
        let initial_capital = request.initial_capital;
        tokio::task::spawn_blocking(move || run_backtest(&config, &candles, initial_capital))
            .await
            .map_err(|e| RuletraderError::Simulation {
                reason: format!("simulation task failed: {e}"),
            })?
    }
}
