//! Lifecycle operations on stored strategies.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::error::RuletraderError;
use crate::domain::lifecycle::StrategyStatus;
use crate::domain::strategy::{Strategy, StrategyConfig};
use crate::ports::event_port::EventPublisher;
use crate::ports::repository_port::StrategyRepository;
use crate::services::{load, persist};

pub struct StrategyService {
    repo: Arc<dyn StrategyRepository>,
    events: Arc<dyn EventPublisher>,
}

impl StrategyService {
    pub fn new(repo: Arc<dyn StrategyRepository>, events: Arc<dyn EventPublisher>) -> Self {
        Self { repo, events }
    }

    pub async fn create(
        &self,
        owner_id: &str,
        config: StrategyConfig,
    ) -> Result<Strategy, RuletraderError> {
        let mut strategy = Strategy::new(owner_id, config, Utc::now())?;
        persist(self.repo.as_ref(), self.events.as_ref(), &mut strategy).await?;
        info!(strategy_id = %strategy.id(), name = %strategy.name(), "strategy created");
        Ok(strategy)
    }

    pub async fn get(&self, id: &str) -> Result<Strategy, RuletraderError> {
        load(self.repo.as_ref(), id).await
    }

    pub async fn list_by_status(&self, status: StrategyStatus) -> Result<Vec<Strategy>, RuletraderError> {
        self.repo.find_by_status(status).await
    }

    pub async fn activate(&self, id: &str) -> Result<Strategy, RuletraderError> {
        self.transition(id, |s| s.activate(Utc::now())).await
    }

    pub async fn pause(&self, id: &str) -> Result<Strategy, RuletraderError> {
        self.transition(id, |s| s.pause(Utc::now())).await
    }

    pub async fn stop(&self, id: &str) -> Result<Strategy, RuletraderError> {
        self.transition(id, |s| s.stop(Utc::now())).await
    }

    pub async fn update_configuration(
        &self,
        id: &str,
        config: StrategyConfig,
    ) -> Result<Strategy, RuletraderError> {
        let strategy = self
            .transition(id, move |s| s.update_configuration(config, Utc::now()))
            .await?;
        if strategy.backtest_is_stale() {
            warn!(
                strategy_id = %id,
                status = %strategy.status(),
                "configuration changed after the last backtest; rerun before relying on it"
            );
        }
        Ok(strategy)
    }

    async fn transition<F>(&self, id: &str, apply: F) -> Result<Strategy, RuletraderError>
    where
        F: FnOnce(&mut Strategy) -> Result<(), RuletraderError> + Send,
    {
        let mut strategy = load(self.repo.as_ref(), id).await?;
        let from = strategy.status();
        apply(&mut strategy)?;
        persist(self.repo.as_ref(), self.events.as_ref(), &mut strategy).await?;
        info!(
            strategy_id = %id,
            from = %from,
            to = %strategy.status(),
            "strategy transition"
        );
        Ok(strategy)
    }
}
