// Result Sink Port

use crate::domain::Outcome;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Consumer of harvested outcomes
///
/// Called once per harvested probe, in harvest order. Ownership of the
/// outcome passes to the sink.
#[async_trait]
pub trait ResultSink: Send {
    async fn accept(&mut self, outcome: Outcome) -> Result<()>;
}

/// Collects every outcome in memory
#[async_trait]
impl ResultSink for Vec<Outcome> {
    async fn accept(&mut self, outcome: Outcome) -> Result<()> {
        self.push(outcome);
        Ok(())
    }
}

/// Streams outcomes to another task; waits when the channel is full
#[async_trait]
impl ResultSink for mpsc::Sender<Outcome> {
    async fn accept(&mut self, outcome: Outcome) -> Result<()> {
        self.send(outcome)
            .await
            .map_err(|_| AppError::Sink("outcome receiver dropped".to_string()))
    }
}

#[async_trait]
impl ResultSink for mpsc::UnboundedSender<Outcome> {
    async fn accept(&mut self, outcome: Outcome) -> Result<()> {
        self.send(outcome)
            .map_err(|_| AppError::Sink("outcome receiver dropped".to_string()))
    }
}
