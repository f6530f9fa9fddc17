//! Application services: lifecycle orchestration, backtest runs and the
//! live scheduler. Services own the ports and never hold a strategy across
//! calls; every mutation is load, transition, save, publish.

pub mod backtest_service;
pub mod scheduler;
pub mod strategy_service;

use tracing::warn;

use crate::domain::error::RuletraderError;
use crate::domain::strategy::Strategy;
use crate::ports::event_port::EventPublisher;
use crate::ports::repository_port::StrategyRepository;

pub(crate) async fn load(
    repo: &dyn StrategyRepository,
    id: &str,
) -> Result<Strategy, RuletraderError> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| RuletraderError::NotFound { id: id.to_string() })
}

/// Save, then hand the drained events to the publisher. Events are only
/// published once the save succeeded; a publish failure is logged, not
/// returned, because the state change is already durable.
pub(crate) async fn persist(
    repo: &dyn StrategyRepository,
    events: &dyn EventPublisher,
    strategy: &mut Strategy,
) -> Result<(), RuletraderError> {
    let version = repo.save(strategy).await?;
    strategy.record_saved(version);
    for event in strategy.take_events() {
        let name = event.name();
        if let Err(e) = events.publish(event).await {
            warn!(strategy_id = %strategy.id(), event = name, error = %e, "event not published");
        }
    }
    Ok(())
}
