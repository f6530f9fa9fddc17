//! Backtest simulator.
//!
//! Replays each symbol's candles through the indicator engine and rule
//! evaluator, holding at most one long position per symbol. Symbols are
//! scanned one after another in configuration order and share one running
//! capital balance.
//!
//! Per candle `i`:
//! 1. flat and entry rules hold: commit `capital * position_size%` at `close[i]`
//! 2. holding a position opened before `i`: stop loss, then take profit,
//!    then exit rules; the first hit closes at `close[i]`
//!
//! A position closed at `i` is not re-entered until `i + 1`. Whatever is
//! still open after a symbol's last candle is closed at that close with
//! reason `end_of_window`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::candle::Candle;
use crate::domain::error::RuletraderError;
use crate::domain::indicator::{IndicatorSet, compute_all};
use crate::domain::metrics::{DrawdownTracker, TradeStats, profitability};
use crate::domain::position::{ExitReason, Position, Trade};
use crate::domain::rule_eval::{evaluate_entry, evaluate_exit};
use crate::domain::strategy::StrategyConfig;

/// Lowest win rate (inclusive) a backtest may have and still pass.
pub const MIN_WIN_RATE_PERCENT: f64 = 40.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub profitability: f64,
    pub max_drawdown: f64,
    pub trades: Vec<Trade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BacktestResult {
    /// Sentinel recorded when a backtest could not run to completion.
    pub fn failed(initial_capital: f64, error: impl Into<String>) -> Self {
        Self {
            initial_capital,
            final_capital: 0.0,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            profitability: -100.0,
            max_drawdown: 0.0,
            trades: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// `profitability > 0`, `win_rate >= 40` and drawdown within the limit.
    pub fn passes(&self, max_drawdown_percent: f64) -> bool {
        self.error.is_none()
            && self.profitability > 0.0
            && self.win_rate >= MIN_WIN_RATE_PERCENT
            && self.max_drawdown <= max_drawdown_percent
    }

    pub fn stats(&self) -> TradeStats {
        TradeStats::compute(&self.trades)
    }
}

struct Simulation<'a> {
    config: &'a StrategyConfig,
    capital: f64,
    drawdown: DrawdownTracker,
    trades: Vec<Trade>,
}

struct OpenPosition {
    position: Position,
    notional: f64,
}

impl<'a> Simulation<'a> {
    fn new(config: &'a StrategyConfig, initial_capital: f64) -> Self {
        Self {
            config,
            capital: initial_capital,
            drawdown: DrawdownTracker::new(initial_capital),
            trades: Vec::new(),
        }
    }

    fn run_symbol(&mut self, symbol: &str, candles: &[Candle]) {
        let indicators = compute_all(&self.config.indicators, candles);
        let mut open: Option<OpenPosition> = None;

        for (i, candle) in candles.iter().enumerate() {
            open = match open.take() {
                None => self.try_enter(symbol, candle, &indicators, i),
                Some(held) => match self.exit_reason(&held.position, candle.close, &indicators, i) {
                    Some(reason) => {
                        self.close(held, candle, reason);
                        None
                    }
                    None => Some(held),
                },
            };
        }

        if let (Some(held), Some(last)) = (open, candles.last()) {
            self.close(held, last, ExitReason::EndOfWindow);
        }
    }

    fn try_enter(
        &mut self,
        symbol: &str,
        candle: &Candle,
        indicators: &IndicatorSet,
        index: usize,
    ) -> Option<OpenPosition> {
        if !evaluate_entry(&self.config.rules, indicators, index) {
            return None;
        }
        let risk = &self.config.risk;
        let notional = self.capital * risk.position_size_percent / 100.0;
        if notional <= 0.0 {
            return None;
        }
        self.capital -= notional;
        let position = Position::open(
            symbol,
            candle.close,
            notional,
            candle.time,
            risk.stop_loss_percent,
            risk.take_profit_percent,
        );
        debug!(
            symbol,
            price = candle.close,
            quantity = position.quantity,
            notional,
            time = %candle.time,
            "open position"
        );
        Some(OpenPosition { position, notional })
    }

    fn exit_reason(
        &self,
        position: &Position,
        price: f64,
        indicators: &IndicatorSet,
        index: usize,
    ) -> Option<ExitReason> {
        if position.should_stop_loss(price) {
            Some(ExitReason::StopLoss)
        } else if position.should_take_profit(price) {
            Some(ExitReason::TakeProfit)
        } else if evaluate_exit(&self.config.rules, indicators, index) {
            Some(ExitReason::ExitSignal)
        } else {
            None
        }
    }

    fn close(&mut self, held: OpenPosition, candle: &Candle, reason: ExitReason) {
        let trade = held.position.close(candle.close, candle.time, reason);
        self.capital += held.notional + trade.profit;
        self.drawdown.record(self.capital);
        debug!(
            symbol = %trade.symbol,
            price = trade.exit_price,
            profit = trade.profit,
            reason = %reason,
            capital = self.capital,
            "close position"
        );
        self.trades.push(trade);
    }

    fn finish(self, initial_capital: f64) -> BacktestResult {
        let stats = TradeStats::compute(&self.trades);
        BacktestResult {
            initial_capital,
            final_capital: self.capital,
            total_trades: stats.total_trades,
            winning_trades: stats.winning_trades,
            losing_trades: stats.losing_trades,
            win_rate: stats.win_rate(),
            profitability: profitability(initial_capital, self.capital),
            max_drawdown: self.drawdown.max_drawdown(),
            trades: self.trades,
            error: None,
        }
    }
}

/// Candles must be strictly increasing in time with finite, positive closes
/// and finite, non-negative volume.
pub fn validate_candles(symbol: &str, candles: &[Candle]) -> Result<(), RuletraderError> {
    for (i, candle) in candles.iter().enumerate() {
        if !candle.volume.is_finite() || candle.volume < 0.0 {
            return Err(RuletraderError::Simulation {
                reason: format!(
                    "{symbol}: candle {i} at {} has invalid volume {}",
                    candle.time, candle.volume
                ),
            });
        }
        if !candle.close.is_finite() || candle.close <= 0.0 {
            return Err(RuletraderError::Simulation {
                reason: format!(
                    "{symbol}: candle {i} at {} has invalid close {}",
                    candle.time, candle.close
                ),
            });
        }
        if i > 0 && candle.time <= candles[i - 1].time {
            return Err(RuletraderError::Simulation {
                reason: format!(
                    "{symbol}: candle {i} at {} is not after {}",
                    candle.time,
                    candles[i - 1].time
                ),
            });
        }
    }
    Ok(())
}

/// Run a backtest of `config` over `candles_by_symbol`. Symbols with no
/// candles simply produce no trades.
pub fn run_backtest(
    config: &StrategyConfig,
    candles_by_symbol: &HashMap<String, Vec<Candle>>,
    initial_capital: f64,
) -> Result<BacktestResult, RuletraderError> {
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(RuletraderError::Simulation {
            reason: format!("initial capital must be positive, got {initial_capital}"),
        });
    }

    let empty: &[Candle] = &[];
    let windows: Vec<(&str, &[Candle])> = config
        .symbols
        .iter()
        .map(|symbol| {
            let candles = candles_by_symbol
                .get(symbol)
                .map(Vec::as_slice)
                .unwrap_or(empty);
            (symbol.as_str(), candles)
        })
        .collect();
    for (symbol, candles) in &windows {
        validate_candles(symbol, candles)?;
    }

    let mut sim = Simulation::new(config, initial_capital);
    for (symbol, candles) in windows {
        sim.run_symbol(symbol, candles);
    }
    Ok(sim.finish(initial_capital))
}
