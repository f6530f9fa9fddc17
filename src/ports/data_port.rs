//! Candle data port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::candle::Candle;
use crate::domain::error::RuletraderError;
use crate::domain::strategy::Timeframe;

/// Source of historical candles. Implementations return candles inside
/// `[start, end]`; short or empty results are not errors.
#[async_trait]
pub trait CandleDataProvider: Send + Sync {
    async fn get_historical_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, RuletraderError>;
}
