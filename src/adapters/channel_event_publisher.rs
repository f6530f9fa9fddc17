//! Event publisher backed by a tokio mpsc channel.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::error::RuletraderError;
use crate::domain::lifecycle::StrategyEvent;
use crate::ports::event_port::EventPublisher;

pub struct ChannelEventPublisher {
    sender: mpsc::Sender<StrategyEvent>,
}

impl ChannelEventPublisher {
    pub fn new(sender: mpsc::Sender<StrategyEvent>) -> Self {
        Self { sender }
    }

    /// Publisher plus the receiving end for a consumer task.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StrategyEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl EventPublisher for ChannelEventPublisher {
    async fn publish(&self, event: StrategyEvent) -> Result<(), RuletraderError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| RuletraderError::EventPublish {
                reason: format!("event channel closed, dropped {} event", e.0.name()),
            })
    }
}
