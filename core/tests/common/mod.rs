#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use puzzler_core::api::{
    PipelineConfig, PipelineEvent, PipelinePlan, ResultTarget, RunConfig, RunForm, RunnerError,
    StageId, StagePlanner, StageSpec, WorkerPlugin, WorkerSession, WorkerStartArgs, WriteMode,
};

/// Wraps a worker and counts how many times it was launched.
pub struct Counted {
    inner: Arc<dyn WorkerPlugin>,
    launches: Arc<AtomicUsize>,
}

impl Counted {
    pub fn wrap(inner: impl WorkerPlugin + 'static) -> (Arc<dyn WorkerPlugin>, Arc<AtomicUsize>) {
        let launches = Arc::new(AtomicUsize::new(0));
        let plugin = Counted {
            inner: Arc::new(inner),
            launches: launches.clone(),
        };
        (Arc::new(plugin), launches)
    }
}

#[async_trait]
impl WorkerPlugin for Counted {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn start_session(
        &self,
        args: &WorkerStartArgs,
    ) -> anyhow::Result<Box<dyn WorkerSession>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.inner.start_session(args).await
    }
}

/// A worker whose binary cannot be started.
pub struct Unlaunchable;

#[async_trait]
impl WorkerPlugin for Unlaunchable {
    fn name(&self) -> &str {
        "unlaunchable"
    }

    async fn start_session(
        &self,
        args: &WorkerStartArgs,
    ) -> anyhow::Result<Box<dyn WorkerSession>> {
        anyhow::bail!("{}: No such file or directory", args.program)
    }
}

pub struct Workers {
    pub generator: Arc<dyn WorkerPlugin>,
    pub puzzler: Arc<dyn WorkerPlugin>,
    pub pgn: Arc<dyn WorkerPlugin>,
}

/// generator (truncate) → puzzler (append, counted) → optional pgn.
/// The puzzler receives its result path as its only argument.
pub fn planner(w: Workers) -> Arc<dyn StagePlanner> {
    Arc::new(
        move |cfg: &RunConfig| -> Result<PipelinePlan, RunnerError> {
            let generator = StageSpec::new(
                StageId::Generate,
                w.generator.clone(),
                WorkerStartArgs::new("generator").args(["--count".to_string(), cfg.count.to_string()]),
            )
            .with_result(ResultTarget::new(&cfg.positions_file, WriteMode::Truncate))
            .with_expected_total(u64::from(cfg.count))
            .with_success_message("Positions generated");

            let puzzler = StageSpec::new(
                StageId::Extract,
                w.puzzler.clone(),
                WorkerStartArgs::new("puzzler").arg(cfg.puzzles_file.display().to_string()),
            )
            .with_result(ResultTarget::new(&cfg.puzzles_file, WriteMode::Append))
            .with_success_message("Puzzles extracted")
            .counting_results();

            let pgn = StageSpec::new(StageId::Convert, w.pgn.clone(), WorkerStartArgs::new("pgn"))
                .with_result(ResultTarget::new(
                    cfg.puzzles_file.with_extension("pgn"),
                    WriteMode::Truncate,
                ));

            Ok(PipelinePlan::new(vec![generator, puzzler]).with_trailing(pgn, cfg.emit_pgn))
        },
    )
}

/// Routes the crate's own tracing output through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("puzzler_core=debug")
        .with_test_writer()
        .try_init();
}

pub fn settings(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        app_log: dir.join("app.log").display().to_string(),
        ..PipelineConfig::default()
    }
}

pub fn form(dir: &Path, emit_pgn: bool) -> RunForm {
    RunForm {
        engine_path: "/opt/engines/fairy-stockfish".into(),
        variant: "atomic".into(),
        count: "100".into(),
        depth: "8".into(),
        threads: "2".into(),
        hash_mb: "64".into(),
        positions_file: dir.join("positions.epd").display().to_string(),
        puzzles_file: dir.join("puzzles.epd").display().to_string(),
        emit_pgn,
        ..RunForm::default()
    }
}

/// Collects events up to and including `RunFinished`.
pub async fn until_finished(rx: &mut UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    tokio::time::timeout(Duration::from_secs(60), async {
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            let done = matches!(ev, PipelineEvent::RunFinished { .. });
            events.push(ev);
            if done {
                break;
            }
        }
        events
    })
    .await
    .expect("run did not finish")
}

pub fn progress_of(events: &[PipelineEvent], stage: StageId) -> Vec<u8> {
    events
        .iter()
        .filter_map(|ev| match ev {
            PipelineEvent::Progress { stage: s, percent } if *s == stage => Some(*percent),
            _ => None,
        })
        .collect()
}

pub fn texts(events: &[PipelineEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|ev| match ev {
            PipelineEvent::LogLine { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

pub fn launches(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
