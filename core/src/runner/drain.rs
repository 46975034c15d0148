//! Stream drainer: consumes both output channels of a running worker
//! concurrently, so a worker that floods one channel can never stall on a
//! pipe nobody is reading.
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::RunnerError;
use crate::util::RingBytes;

use super::io_pump::{self, LineTap};
use super::traits::WorkerSession;
use super::types::Channel;

/// Receives every drained line, in per-channel order.
#[async_trait]
pub trait LineHandler: Send {
    async fn on_line(&mut self, tap: LineTap);

    /// A channel failed mid-stream; it is treated as exhausted.
    async fn on_stream_error(&mut self, channel: Channel, err: &RunnerError);
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub primary_lines: u64,
    pub diagnostic_lines: u64,
    pub stream_errors: usize,
}

#[derive(Debug, Clone)]
pub struct DrainOptions {
    pub line_channel_capacity: usize,
    /// Ring buffer that keeps the end of the diagnostic channel.
    pub diagnostic_tail: Option<Arc<RingBytes>>,
}

impl Default for DrainOptions {
    fn default() -> Self {
        Self {
            line_channel_capacity: 1024,
            diagnostic_tail: None,
        }
    }
}

/// Drains both channels of `session` until each reaches end-of-stream.
///
/// Returns only once both pump tasks have finished, so `wait` on the session
/// afterwards never races with trailing output.
pub async fn drain_session<H>(
    session: &mut dyn WorkerSession,
    opts: &DrainOptions,
    handler: &mut H,
) -> DrainReport
where
    H: LineHandler + ?Sized,
{
    let (line_tx, mut line_rx) = mpsc::channel::<LineTap>(opts.line_channel_capacity.max(1));

    let primary = session
        .primary()
        .map(|rd| io_pump::pump_lines(rd, Channel::Primary, None, line_tx.clone()));
    let diagnostic = session.diagnostic().map(|rd| {
        io_pump::pump_lines(
            rd,
            Channel::Diagnostic,
            opts.diagnostic_tail.clone(),
            line_tx.clone(),
        )
    });
    drop(line_tx);

    while let Some(tap) = line_rx.recv().await {
        handler.on_line(tap).await;
    }

    let mut report = DrainReport::default();
    for (channel, task) in [(Channel::Primary, primary), (Channel::Diagnostic, diagnostic)] {
        let Some(task) = task else {
            continue;
        };
        let err = match task.await {
            Ok(Ok(lines)) => {
                match channel {
                    Channel::Primary => report.primary_lines = lines,
                    _ => report.diagnostic_lines = lines,
                }
                continue;
            }
            Ok(Err(e)) => e,
            Err(join) => RunnerError::Plugin(anyhow::anyhow!("pump task failed: {join}")),
        };
        tracing::warn!(error.kind = "stream.io", channel = %channel, error = %err);
        report.stream_errors += 1;
        handler.on_stream_error(channel, &err).await;
    }

    report
}
