use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::types::{WorkerOutcome, WorkerStartArgs};

/// A started unit of work. Dropping the session releases the worker.
#[async_trait]
pub trait WorkerSession: Send {
    /// Result-bearing output. Can be taken once.
    fn primary(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    /// Logs and progress. Can be taken once.
    fn diagnostic(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    /// Only called after both channels have been drained.
    async fn wait(&mut self) -> anyhow::Result<WorkerOutcome>;
}

#[async_trait]
pub trait WorkerPlugin: Send + Sync {
    fn name(&self) -> &str;
    async fn start_session(&self, args: &WorkerStartArgs)
        -> anyhow::Result<Box<dyn WorkerSession>>;
}
