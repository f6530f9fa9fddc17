//! Paper-trading order sink: logs each signal and keeps it for inspection.

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

use crate::domain::error::RuletraderError;
use crate::domain::signal::OutboundSignal;
use crate::ports::order_port::OrderSubmission;

#[derive(Default)]
pub struct LoggingOrderSink {
    submitted: Mutex<Vec<OutboundSignal>>,
}

impl LoggingOrderSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<OutboundSignal> {
        match self.submitted.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl OrderSubmission for LoggingOrderSink {
    async fn submit(&self, signal: OutboundSignal) -> Result<(), RuletraderError> {
        info!(
            strategy_id = %signal.strategy_id,
            symbol = %signal.symbol,
            side = %signal.side,
            price = signal.sizing.reference_price,
            size_percent = signal.sizing.position_size_percent,
            "entry signal"
        );
        let mut guard = self.submitted.lock().map_err(|_| RuletraderError::OrderSubmission {
            reason: "signal log lock poisoned".into(),
        })?;
        guard.push(signal);
        Ok(())
    }
}
