//! Performance metrics for simulated trading.
//!
//! Drawdown is sampled on the capital balance at each trade close, with the
//! running peak starting at the initial capital. All percentages are on a
//! 0..100 scale.

use crate::domain::position::Trade;

/// Running peak-to-trough tracker over a capital balance.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownTracker {
    peak: f64,
    max_drawdown: f64,
}

impl DrawdownTracker {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            peak: initial_capital,
            max_drawdown: 0.0,
        }
    }

    pub fn record(&mut self, capital: f64) {
        if capital > self.peak {
            self.peak = capital;
        } else if self.peak > 0.0 {
            let drawdown = (self.peak - capital) / self.peak * 100.0;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }
    }

    /// Largest drop seen so far, as a percentage of the peak it fell from.
    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }
}

pub fn win_rate(winning: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        winning as f64 / total as f64 * 100.0
    }
}

pub fn profitability(initial_capital: f64, final_capital: f64) -> f64 {
    if initial_capital > 0.0 {
        (final_capital - initial_capital) / initial_capital * 100.0
    } else {
        0.0
    }
}

/// Per-trade statistics reported alongside a backtest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

impl TradeStats {
    pub fn compute(trades: &[Trade]) -> Self {
        let mut stats = TradeStats {
            total_trades: trades.len(),
            ..TradeStats::default()
        };

        for trade in trades {
            let profit = trade.profit;
            if trade.is_winner() {
                stats.winning_trades += 1;
                stats.gross_profit += profit;
                stats.largest_win = stats.largest_win.max(profit);
            } else {
                stats.losing_trades += 1;
                stats.gross_loss += profit.abs();
                stats.largest_loss = stats.largest_loss.max(profit.abs());
            }
        }

        stats
    }

    pub fn win_rate(&self) -> f64 {
        win_rate(self.winning_trades, self.total_trades)
    }

    /// Gross profit over gross loss; infinite with wins and no losses.
    pub fn profit_factor(&self) -> f64 {
        if self.gross_loss > 0.0 {
            self.gross_profit / self.gross_loss
        } else if self.gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }

    pub fn average_win(&self) -> f64 {
        if self.winning_trades > 0 {
            self.gross_profit / self.winning_trades as f64
        } else {
            0.0
        }
    }

    pub fn average_loss(&self) -> f64 {
        if self.losing_trades > 0 {
            self.gross_loss / self.losing_trades as f64
        } else {
            0.0
        }
    }
}
