//! Domain event publication port.

use async_trait::async_trait;

use crate::domain::error::RuletraderError;
use crate::domain::lifecycle::StrategyEvent;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: StrategyEvent) -> Result<(), RuletraderError>;
}
