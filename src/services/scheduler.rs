//! Live execution scheduler.
//!
//! Each tick walks every `ACTIVE` strategy and each of its symbols, pulls a
//! recent candle window, and submits an entry signal when the entry rules
//! hold on the latest candle. Pairs run concurrently on a `JoinSet`, bounded
//! by a semaphore, each under its own timeout, with a deadline over the
//! whole tick.
//!
//! A failing pair is logged and skipped. Live failures never touch the
//! strategy's lifecycle status. Exit conditions of open live positions are
//! not monitored here; signals are entry-only.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::backtest::validate_candles;
use crate::domain::candle::Candle;
use crate::domain::error::RuletraderError;
use crate::domain::indicator::compute_all;
use crate::domain::lifecycle::StrategyStatus;
use crate::domain::rule_eval::evaluate_entry;
use crate::domain::signal::OutboundSignal;
use crate::domain::strategy::Strategy;
use crate::ports::data_port::CandleDataProvider;
use crate::ports::order_port::OrderSubmission;
use crate::ports::repository_port::StrategyRepository;

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub pair_timeout: Duration,
    pub tick_deadline: Duration,
    pub max_concurrency: usize,
    /// Extra candles requested beyond the longest indicator warm-up.
    pub warmup_buffer: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pair_timeout: Duration::from_secs(5),
            tick_deadline: Duration::from_secs(30),
            max_concurrency: 8,
            warmup_buffer: 10,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), RuletraderError> {
        if self.pair_timeout.is_zero() {
            return Err(RuletraderError::validation("pair_timeout", "must be positive"));
        }
        if self.tick_deadline.is_zero() {
            return Err(RuletraderError::validation("tick_deadline", "must be positive"));
        }
        if self.max_concurrency == 0 {
            return Err(RuletraderError::validation("max_concurrency", "must be at least 1"));
        }
        Ok(())
    }
}

/// Outcome counts for one tick. `pairs` is what was scheduled; every pair
/// ends up in exactly one of signalled, quiet, failed or timed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub pairs: usize,
    pub signals: usize,
    pub failures: usize,
    pub timed_out: usize,
}

/// Evaluate the entry rules of `strategy` on the last candle of `candles`.
///
/// Too few candles for the indicator warm-up means no signal, not an error.
pub fn evaluate_latest(
    strategy: &Strategy,
    symbol: &str,
    candles: &[Candle],
    now: DateTime<Utc>,
) -> Result<Option<OutboundSignal>, RuletraderError> {
    validate_candles(symbol, candles)?;
    let Some(last) = candles.last() else {
        return Ok(None);
    };
    if candles.len() < strategy.required_candles() {
        debug!(
            strategy_id = %strategy.id(),
            symbol,
            candles = candles.len(),
            required = strategy.required_candles(),
            "window shorter than warm-up"
        );
        return Ok(None);
    }

    let indicators = compute_all(strategy.indicators(), candles);
    if !evaluate_entry(strategy.rules(), &indicators, candles.len() - 1) {
        return Ok(None);
    }
    Ok(Some(OutboundSignal::entry(
        strategy.id(),
        symbol,
        strategy.risk(),
        last.close,
        now,
    )))
}

enum PairOutcome {
    Signal,
    Quiet,
    Failed,
    TimedOut,
}

pub struct LiveExecutionScheduler {
    repo: Arc<dyn StrategyRepository>,
    data: Arc<dyn CandleDataProvider>,
    orders: Arc<dyn OrderSubmission>,
    config: SchedulerConfig,
}

impl LiveExecutionScheduler {
    pub fn new(
        repo: Arc<dyn StrategyRepository>,
        data: Arc<dyn CandleDataProvider>,
        orders: Arc<dyn OrderSubmission>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            repo,
            data,
            orders,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run one tick as of `now`. Only the repository lookup can fail the
    /// tick as a whole.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, RuletraderError> {
        let deadline = Instant::now() + self.config.tick_deadline;
        let strategies = self.repo.find_by_status(StrategyStatus::Active).await?;

        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut report = TickReport::default();

        for strategy in strategies {
            let strategy = Arc::new(strategy);
            for symbol in strategy.symbols() {
                report.pairs += 1;
                let pair = PairJob {
                    strategy: Arc::clone(&strategy),
                    symbol: symbol.clone(),
                    data: Arc::clone(&self.data),
                    orders: Arc::clone(&self.orders),
                    warmup_buffer: self.config.warmup_buffer,
                    now,
                };
                let permits = Arc::clone(&permits);
                let pair_timeout = self.config.pair_timeout;
                tasks.spawn(async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return PairOutcome::Failed;
                    };
                    pair.run(pair_timeout).await
                });
            }
        }

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(None) => break,
                Ok(Some(Ok(outcome))) => match outcome {
                    PairOutcome::Signal => report.signals += 1,
                    PairOutcome::Quiet => {}
                    PairOutcome::Failed => report.failures += 1,
                    PairOutcome::TimedOut => report.timed_out += 1,
                },
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "pair task panicked");
                    report.failures += 1;
                }
                Err(_) => {
                    let outstanding = tasks.len();
                    warn!(
                        outstanding,
                        deadline_ms = self.config.tick_deadline.as_millis() as u64,
                        "tick deadline reached, aborting remaining pairs"
                    );
                    report.timed_out += outstanding;
                    tasks.abort_all();
                    break;
                }
            }
        }

        info!(
            pairs = report.pairs,
            signals = report.signals,
            failures = report.failures,
            timed_out = report.timed_out,
            "tick finished"
        );
        Ok(report)
    }

    /// Tick every `period` until `shutdown` turns true or its sender drops.
    /// A missed period is skipped rather than replayed in a burst.
    pub async fn run(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_ms = period.as_millis() as u64, "scheduler started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick(Utc::now()).await {
                        warn!(error = %e, "tick failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("scheduler stopped");
    }
}

struct PairJob {
    strategy: Arc<Strategy>,
    symbol: String,
    data: Arc<dyn CandleDataProvider>,
    orders: Arc<dyn OrderSubmission>,
    warmup_buffer: usize,
    now: DateTime<Utc>,
}

impl PairJob {
    async fn run(self, pair_timeout: Duration) -> PairOutcome {
        let strategy_id = self.strategy.id().to_string();
        let symbol = self.symbol.clone();
        match tokio::time::timeout(pair_timeout, self.evaluate()).await {
            Ok(Ok(true)) => PairOutcome::Signal,
            Ok(Ok(false)) => PairOutcome::Quiet,
            Ok(Err(e)) => {
                warn!(strategy_id = %strategy_id, symbol = %symbol, error = %e, "pair skipped");
                PairOutcome::Failed
            }
            Err(_) => {
                let timeout = RuletraderError::Timeout {
                    operation: format!("evaluate {symbol}"),
                    millis: pair_timeout.as_millis() as u64,
                };
                warn!(strategy_id = %strategy_id, symbol = %symbol, error = %timeout, "pair skipped");
                PairOutcome::TimedOut
            }
        }
    }

    async fn evaluate(&self) -> Result<bool, RuletraderError> {
        let strategy = self.strategy.as_ref();
        let bars = strategy.required_candles() + self.warmup_buffer;
        let span = strategy.timeframe().duration() * i32::try_from(bars).unwrap_or(i32::MAX);
        let start = self.now - span;

        let candles = self
            .data
            .get_historical_candles(&self.symbol, strategy.timeframe(), start, self.now)
            .await?;

        match evaluate_latest(strategy, &self.symbol, &candles, self.now)? {
            Some(signal) => {
                self.orders.submit(signal).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
