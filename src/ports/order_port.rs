//! Order submission port: where live entry signals go.

use async_trait::async_trait;

use crate::domain::error::RuletraderError;
use crate::domain::signal::OutboundSignal;

/// Fire-and-forget from the core's point of view: an `Ok` means the signal
/// was accepted, not that an order filled.
#[async_trait]
pub trait OrderSubmission: Send + Sync {
    async fn submit(&self, signal: OutboundSignal) -> Result<(), RuletraderError>;
}
