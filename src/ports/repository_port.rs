//! Strategy persistence port.

use async_trait::async_trait;

use crate::domain::error::RuletraderError;
use crate::domain::lifecycle::StrategyStatus;
use crate::domain::strategy::Strategy;

#[async_trait]
pub trait StrategyRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Strategy>, RuletraderError>;

    async fn find_by_status(&self, status: StrategyStatus) -> Result<Vec<Strategy>, RuletraderError>;

    /// Persist `strategy` atomically and return its new version.
    ///
    /// `strategy.version()` must equal the stored version (0 for a new
    /// strategy), otherwise the save fails with `Conflict`.
    async fn save(&self, strategy: &Strategy) -> Result<u64, RuletraderError>;
}
