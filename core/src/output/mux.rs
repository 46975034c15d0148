//! Fans every consumed line out to the application log, the live event sink
//! and the active stage's result file. A failing destination is skipped
//! without affecting the others.
use std::path::PathBuf;

use crate::events::{EventSink, PipelineEvent};
use crate::pipeline::StageId;
use crate::runner::Channel;

use super::app_log::AppLog;
use super::result_file::{ResultTarget, ResultWriter};

pub struct OutputMux {
    log: AppLog,
    events: EventSink,
    stage: Option<StageId>,
    result: Option<ResultWriter>,
    result_path: Option<PathBuf>,
}

impl OutputMux {
    pub fn new(log: AppLog, events: EventSink) -> Self {
        Self {
            log,
            events,
            stage: None,
            result: None,
            result_path: None,
        }
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Writes the stage banner. The result file is opened separately, once
    /// the worker is running.
    pub async fn begin_stage(&mut self, stage: StageId, command: &str) {
        self.stage = Some(stage);
        self.log.write_line(format!("--- Running: {command} ---")).await;
        self.events.emit(PipelineEvent::StageStarted {
            stage,
            command: command.to_string(),
        });
        self.events
            .log_line(Some(stage), Channel::Status, format!("Running: {command}"));
    }

    /// Opens the active stage's result file per its write mode.
    pub async fn open_result(&mut self, target: &ResultTarget) {
        self.result_path = Some(target.path.clone());
        match ResultWriter::open(target.clone()).await {
            Ok(w) => self.result = Some(w),
            Err(e) => {
                tracing::warn!(
                    error.kind = "result.open",
                    stage = ?self.stage,
                    path = %target.path.display(),
                    error = %e
                );
                self.failure(format!(
                    "✗ Cannot open result file {}: {e}",
                    target.path.display()
                ))
                .await;
            }
        }
    }

    /// A primary-channel line. Blank lines are logged but never forwarded.
    pub async fn primary(&mut self, line: &str) {
        self.log_tagged(Channel::Primary, line).await;
        if line.trim().is_empty() {
            return;
        }
        self.events
            .log_line(self.stage, Channel::Primary, line.to_string());

        let Some(w) = self.result.as_mut() else {
            return;
        };
        if let Err(e) = w.write_line(line).await {
            let path = w.path().display().to_string();
            tracing::warn!(error.kind = "result.write", path = %path, error = %e);
            // Skip the file for the rest of the stage.
            self.result = None;
            self.failure(format!("✗ Cannot write result file {path}: {e}"))
                .await;
        }
    }

    /// A diagnostic-channel line. Progress signals are logged but not
    /// forwarded to the live sink (`forward = false`).
    pub async fn diagnostic(&mut self, line: &str, forward: bool) {
        self.log_tagged(Channel::Diagnostic, line).await;
        if forward && !line.trim().is_empty() {
            self.events
                .log_line(self.stage, Channel::Diagnostic, line.to_string());
        }
    }

    pub fn progress(&self, stage: StageId, percent: u8) {
        self.events.emit(PipelineEvent::Progress { stage, percent });
    }

    /// Banner or status marker, written untagged to both log and sink.
    pub async fn status(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.log.write_line(text.clone()).await;
        self.events.log_line(self.stage, Channel::Status, text);
    }

    /// Same as `status`, and mirrored to the tool's own diagnostics.
    pub async fn failure(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::error!(stage = ?self.stage, "{text}");
        self.status(text).await;
    }

    /// Settles the result file for the stage outcome and returns the paths
    /// the stage wrote.
    pub async fn end_stage(&mut self, success: bool) -> Vec<PathBuf> {
        let path = self.result_path.take();
        if let Some(w) = self.result.take() {
            match w.finish(success).await {
                Ok(lines) => tracing::debug!(stage = ?self.stage, lines, "result file closed"),
                Err(e) => {
                    tracing::warn!(error.kind = "result.finish", stage = ?self.stage, error = %e);
                    self.failure(format!("✗ Cannot finalize result file: {e}"))
                        .await;
                }
            }
        }
        path.into_iter().collect()
    }

    /// Leaves stage context; later lines are run-level.
    pub fn clear_stage(&mut self) {
        self.stage = None;
    }

    /// Flushes the application log. The sink stays with the caller.
    pub async fn close(self) -> EventSink {
        if self.log.close().await {
            let text = "✗ Application log write failed; some lines were not saved".to_string();
            tracing::error!("{text}");
            self.events.log_line(None, Channel::Status, text);
        }
        self.events
    }

    async fn log_tagged(&self, channel: Channel, line: &str) {
        let stage = self.stage.map(StageId::as_str).unwrap_or("run");
        self.log
            .write_line(format!("[{stage}][{channel}] {line}"))
            .await;
    }
}
