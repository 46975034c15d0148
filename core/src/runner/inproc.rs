//! In-process workers: an async callable run on the runtime instead of a
//! child process. The callable writes result lines to the primary channel
//! and reports progress through a `ProgressReporter`, which stands in for
//! the diagnostic channel.
use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use crate::util::panic_message;

use super::traits::{WorkerPlugin, WorkerSession};
use super::types::{WorkerOutcome, WorkerStartArgs};

const DEFAULT_PIPE_BYTES: usize = 64 * 1024;

pub type InProcessFn =
    Arc<dyn Fn(WorkerStartArgs, InProcessIo) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Progress callback handed to in-process workers.
///
/// Reports are written as diagnostic lines (`"42%"`, `"7/20"`) so they take
/// the same extraction path as output from external workers.
pub struct ProgressReporter {
    wr: DuplexStream,
}

impl ProgressReporter {
    pub async fn percent(&mut self, percent: f64) -> std::io::Result<()> {
        self.log(&format!("{percent}%")).await
    }

    pub async fn counter(&mut self, done: u64, total: u64) -> std::io::Result<()> {
        self.log(&format!("{done}/{total}")).await
    }

    /// Free-form diagnostic text.
    pub async fn log(&mut self, text: &str) -> std::io::Result<()> {
        self.wr.write_all(text.as_bytes()).await?;
        self.wr.write_all(b"\n").await
    }
}

pub struct InProcessIo {
    primary: DuplexStream,
    progress: ProgressReporter,
}

impl InProcessIo {
    /// Writes one result line to the primary channel.
    pub async fn emit(&mut self, line: &str) -> std::io::Result<()> {
        self.primary.write_all(line.as_bytes()).await?;
        self.primary.write_all(b"\n").await
    }

    pub fn progress(&mut self) -> &mut ProgressReporter {
        &mut self.progress
    }
}

pub struct InProcessWorkerPlugin {
    name: String,
    func: InProcessFn,
    pipe_bytes: usize,
}

impl InProcessWorkerPlugin {
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(WorkerStartArgs, InProcessIo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(
                move |args: WorkerStartArgs, io: InProcessIo| -> BoxFuture<'static, anyhow::Result<()>> {
                    func(args, io).boxed()
                },
            ),
            pipe_bytes: DEFAULT_PIPE_BYTES,
        }
    }

    /// Capacity of each in-memory channel; a full channel blocks the worker
    /// until the drainer catches up, as a pipe would.
    pub fn with_pipe_bytes(mut self, pipe_bytes: usize) -> Self {
        self.pipe_bytes = pipe_bytes.max(1);
        self
    }
}

#[async_trait]
impl WorkerPlugin for InProcessWorkerPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start_session(
        &self,
        args: &WorkerStartArgs,
    ) -> anyhow::Result<Box<dyn WorkerSession>> {
        let (primary_wr, primary_rd) = tokio::io::duplex(self.pipe_bytes);
        let (diag_wr, diag_rd) = tokio::io::duplex(self.pipe_bytes);
        let io = InProcessIo {
            primary: primary_wr,
            progress: ProgressReporter { wr: diag_wr },
        };

        let handle = tokio::spawn((self.func)(args.clone(), io));

        Ok(Box::new(InProcessSession {
            handle: Some(handle),
            primary: Some(primary_rd),
            diagnostic: Some(diag_rd),
        }))
    }
}

struct InProcessSession {
    handle: Option<JoinHandle<anyhow::Result<()>>>,
    primary: Option<DuplexStream>,
    diagnostic: Option<DuplexStream>,
}

#[async_trait]
impl WorkerSession for InProcessSession {
    fn primary(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.primary
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn diagnostic(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.diagnostic
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn wait(&mut self) -> anyhow::Result<WorkerOutcome> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| anyhow!("in-process worker already awaited"))?;
        match handle.await {
            Ok(Ok(())) => Ok(WorkerOutcome::exited(0)),
            // `{:?}` keeps the whole context chain (and a backtrace when captured).
            Ok(Err(e)) => Ok(WorkerOutcome::faulted(format!("{e:?}"))),
            Err(e) if e.is_panic() => Ok(WorkerOutcome::faulted(format!(
                "worker panicked: {}",
                panic_message(e.into_panic())
            ))),
            Err(e) => Err(anyhow!(e)),
        }
    }
}

impl Drop for InProcessSession {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
