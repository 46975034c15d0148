//! Runs one stage: launch, drain both channels, wait, settle outputs.
use async_trait::async_trait;

use crate::config::PipelineConfig;
use crate::error::{RunnerError, StageError};
use crate::output::OutputMux;
use crate::progress::{extractor_for, Extraction, ProgressExtractor, StageProgress};
use crate::runner::{drain_session, Channel, DrainOptions, LineHandler, LineTap};
use crate::util::RingBytes;

use super::types::{StageId, StageResult, StageSpec};

struct StageLines<'a> {
    stage: StageId,
    mux: &'a mut OutputMux,
    extractor: Box<dyn ProgressExtractor>,
    progress: StageProgress,
}

impl<'a> StageLines<'a> {
    fn advance(&mut self, percent: u8) {
        if let Some(p) = self.progress.observe(percent) {
            self.mux.progress(self.stage, p);
        }
    }
}

#[async_trait]
impl<'a> LineHandler for StageLines<'a> {
    async fn on_line(&mut self, tap: LineTap) {
        match tap.channel {
            Channel::Primary => self.mux.primary(&tap.line).await,
            _ => match self.extractor.extract(&tap.line) {
                Extraction::Progress(p) => {
                    self.mux.diagnostic(&tap.line, false).await;
                    self.advance(p);
                }
                Extraction::Plain { estimate } => {
                    self.mux.diagnostic(&tap.line, true).await;
                    if let Some(p) = estimate {
                        self.advance(p);
                    }
                }
            },
        }
    }

    async fn on_stream_error(&mut self, channel: Channel, err: &RunnerError) {
        self.mux
            .failure(format!("✗ Error reading {channel}: {err}"))
            .await;
    }
}

/// Runs `spec` to completion. Never panics on worker failure; every outcome
/// is folded into the returned `StageResult`.
pub async fn run_stage(
    spec: &StageSpec,
    mux: &mut OutputMux,
    settings: &PipelineConfig,
) -> StageResult {
    let stage = spec.id;
    let command = spec.args.command_line();
    tracing::info!(stage = %stage, worker = spec.worker.name(), command = %command, "stage.start");

    mux.begin_stage(stage, &command).await;
    let mut progress = StageProgress::new();
    mux.progress(stage, progress.start());

    let mut session = match spec.worker.start_session(&spec.args).await {
        Ok(s) => s,
        Err(e) => {
            let err = StageError::Launch(format!("{e:#}"));
            tracing::error!(stage = %stage, error.kind = "stage.launch", error = %err);
            mux.failure(err.marker_line()).await;
            let outputs = mux.end_stage(false).await;
            return StageResult::failed(stage, None, err, outputs);
        }
    };
    // Only a running worker may truncate the previous result.
    if let Some(target) = &spec.result {
        mux.open_result(target).await;
    }

    let tail = RingBytes::new(settings.diagnostic_tail_bytes.max(1));
    let opts = DrainOptions {
        line_channel_capacity: settings.line_channel_capacity,
        diagnostic_tail: Some(tail.clone()),
    };
    let mut lines = StageLines {
        stage,
        mux: &mut *mux,
        extractor: extractor_for(spec.expected_total),
        progress,
    };
    let report = drain_session(session.as_mut(), &opts, &mut lines).await;
    let StageLines { mut progress, .. } = lines;
    tracing::debug!(
        stage = %stage,
        primary_lines = report.primary_lines,
        diagnostic_lines = report.diagnostic_lines,
        stream_errors = report.stream_errors,
        "stage.drained"
    );

    let waited = session.wait().await;
    // Releases the process / task handle before the outcome is reported.
    drop(session);

    let (exit_code, error) = match waited {
        Ok(outcome) => match outcome.fault {
            Some(detail) => (Some(outcome.exit_code), Some(StageError::Fault { detail })),
            None if outcome.exit_code == 0 => (Some(0), None),
            None => (
                Some(outcome.exit_code),
                Some(StageError::Exit {
                    code: outcome.exit_code,
                    diagnostic_tail: tail.to_string_lossy(),
                }),
            ),
        },
        Err(e) => (None, Some(StageError::Wait(format!("{e:#}")))),
    };

    let success = error.is_none();
    let outputs = mux.end_stage(success).await;

    match error {
        None => {
            if let Some(p) = progress.complete() {
                mux.progress(stage, p);
            }
            mux.status(format!("✓ {}", spec.success_message)).await;
            tracing::info!(stage = %stage, exit_code = 0, "stage.finish");
            StageResult::succeeded(stage, 0, outputs)
        }
        Some(err) => {
            tracing::error!(stage = %stage, exit_code = ?exit_code, error = %err, "stage.failed");
            mux.failure(err.marker_line()).await;
            if let StageError::Exit {
                diagnostic_tail, ..
            } = &err
            {
                if !diagnostic_tail.trim().is_empty() {
                    tracing::debug!(stage = %stage, tail = %diagnostic_tail, "stage.diagnostic_tail");
                }
            }
            StageResult::failed(stage, exit_code, err, outputs)
        }
    }
}
