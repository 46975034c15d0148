//! Process-wide entry point: at most one run at a time, each run on its own
//! background task, results reported through the one-way event channel.
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::config::{PipelineConfig, RunConfig, RunForm};
use crate::error::StartError;
use crate::events::{EventSink, PipelineEvent};
use crate::output::{AppLog, OutputMux};
use crate::util::panic_message;

use super::planner::StagePlanner;
use super::sequencer::{run_pipeline, RunContext};
use super::types::{PipelinePlan, RunReport, RunState};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    state: AtomicU8,
    planner: Arc<dyn StagePlanner>,
    settings: PipelineConfig,
}

/// Holds the single-run slot; dropping it re-arms the orchestrator.
struct RunGuard {
    inner: Arc<OrchestratorInner>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.inner.state.store(IDLE, Ordering::Release);
    }
}

impl Orchestrator {
    pub fn new(planner: Arc<dyn StagePlanner>, settings: PipelineConfig) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                state: AtomicU8::new(IDLE),
                planner,
                settings,
            }),
        }
    }

    pub fn settings(&self) -> &PipelineConfig {
        &self.inner.settings
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == RUNNING
    }

    /// Validates `form` and starts a run on a background task.
    ///
    /// Rejected synchronously, never queued, when a run is already active
    /// or the form is invalid. In both cases no worker is launched and no
    /// event is emitted. Must be called from within a tokio runtime.
    pub fn start_run(&self, form: &RunForm, events: EventSink) -> Result<RunHandle, StartError> {
        if self.is_running() {
            return Err(StartError::AlreadyRunning);
        }
        let cfg = form.validate()?;
        self.start(&cfg, events)
    }

    /// Starts a run from an already validated configuration.
    pub fn start(&self, cfg: &RunConfig, events: EventSink) -> Result<RunHandle, StartError> {
        if self.is_running() {
            return Err(StartError::AlreadyRunning);
        }
        let plan = self.inner.planner.plan(cfg).map_err(StartError::Plan)?;
        let guard = self.acquire()?;

        let run_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(run_id = %run_id, stages = plan.len(), "run.start");
        let task = tokio::spawn(drive(
            guard,
            run_id.clone(),
            plan,
            self.inner.settings.clone(),
            events,
        ));
        Ok(RunHandle { run_id, task })
    }

    fn acquire(&self) -> Result<RunGuard, StartError> {
        self.inner
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| StartError::AlreadyRunning)?;
        Ok(RunGuard {
            inner: self.inner.clone(),
        })
    }
}

async fn drive(
    guard: RunGuard,
    run_id: String,
    plan: PipelinePlan,
    settings: PipelineConfig,
    events: EventSink,
) -> RunReport {
    let log = open_app_log(&settings).await;
    let log_missing = !log.is_enabled();
    let mut mux = OutputMux::new(log, events.clone());

    events.emit(PipelineEvent::RunStarted {
        run_id: run_id.clone(),
        stages: plan.ids(),
    });
    if log_missing {
        mux.failure(format!(
            "✗ Cannot open application log {}",
            settings.app_log
        ))
        .await;
    }
    mux.status(format!(
        "=== Run {run_id} started {} ===",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ))
    .await;

    let mut ctx = RunContext::new(run_id);
    let outcome = AssertUnwindSafe(run_pipeline(&plan, &mut mux, &settings, &mut ctx))
        .catch_unwind()
        .await;
    if let Err(payload) = outcome {
        let detail = panic_message(payload);
        tracing::error!(run_id = %ctx.run_id, error.kind = "run.panic", detail = %detail);
        ctx.state = RunState::Failed;
        ctx.error = Some(format!("exception: {detail}"));
        mux.clear_stage();
        mux.failure(format!("✗ Exception: {detail}")).await;
    }

    let events = mux.close().await;
    let report = RunReport {
        run_id: ctx.run_id.clone(),
        state: ctx.state,
        results: std::mem::take(&mut ctx.results),
        items: ctx.items,
        error: ctx.error.clone(),
    };
    tracing::info!(
        run_id = %report.run_id,
        state = %report.state,
        success = ctx.success(),
        "run.finish"
    );

    // Idle before the terminal event, so a start issued from the event
    // handler is accepted.
    drop(guard);
    events.emit(PipelineEvent::RunFinished {
        state: report.state,
        error: report.error.clone(),
    });
    report
}

async fn open_app_log(settings: &PipelineConfig) -> AppLog {
    let path = Path::new(&settings.app_log);
    match AppLog::open(path, settings.log_channel_capacity).await {
        Ok(log) => log,
        Err(e) => {
            tracing::warn!(error.kind = "app_log.open", path = %path.display(), error = %e);
            AppLog::disabled()
        }
    }
}

/// Handle to a started run.
pub struct RunHandle {
    run_id: String,
    task: JoinHandle<RunReport>,
}

impl RunHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Waits for the run to reach a terminal state.
    pub async fn wait(self) -> RunReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => RunReport {
                run_id: self.run_id,
                state: RunState::Failed,
                results: Vec::new(),
                items: None,
                error: Some(format!("run task failed: {e}")),
            },
        }
    }
}
