//! In-memory strategy repository with optimistic version checks.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::error::RuletraderError;
use crate::domain::lifecycle::StrategyStatus;
use crate::domain::strategy::Strategy;
use crate::ports::repository_port::StrategyRepository;

#[derive(Default)]
pub struct InMemoryStrategyRepository {
    strategies: RwLock<HashMap<String, Strategy>>,
}

impl InMemoryStrategyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.strategies.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.strategies.read().await.is_empty()
    }
}

#[async_trait]
impl StrategyRepository for InMemoryStrategyRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Strategy>, RuletraderError> {
        Ok(self.strategies.read().await.get(id).cloned())
    }

    async fn find_by_status(&self, status: StrategyStatus) -> Result<Vec<Strategy>, RuletraderError> {
        let guard = self.strategies.read().await;
        let mut found: Vec<Strategy> = guard
            .values()
            .filter(|s| s.status() == status)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at().cmp(&b.created_at()).then_with(|| a.id().cmp(b.id())));
        Ok(found)
    }

    async fn save(&self, strategy: &Strategy) -> Result<u64, RuletraderError> {
        let mut guard = self.strategies.write().await;
        let stored_version = guard.get(strategy.id()).map_or(0, Strategy::version);
        if stored_version != strategy.version() {
            return Err(RuletraderError::Conflict {
                id: strategy.id().to_string(),
                expected: strategy.version(),
                found: stored_version,
            });
        }

        let version = stored_version + 1;
        let mut stored = strategy.clone();
        stored.record_saved(version);
        stored.take_events();
        guard.insert(stored.id().to_string(), stored);
        Ok(version)
    }
}
