use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::error::StageError;
use crate::output::ResultTarget;
use crate::runner::{WorkerPlugin, WorkerStartArgs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StageId {
    /// Position generation.
    #[serde(rename = "generator")]
    Generate,
    /// Puzzle extraction.
    #[serde(rename = "puzzler")]
    Extract,
    /// Notation conversion (EPD → PGN).
    #[serde(rename = "pgn")]
    Convert,
}

impl StageId {
    pub fn as_str(self) -> &'static str {
        match self {
            StageId::Generate => "generator",
            StageId::Extract => "puzzler",
            StageId::Convert => "pgn",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work. Immutable once a run has been planned.
#[derive(Clone)]
pub struct StageSpec {
    pub id: StageId,
    pub worker: Arc<dyn WorkerPlugin>,
    pub args: WorkerStartArgs,
    pub result: Option<ResultTarget>,
    pub success_message: String,
    /// Item count the worker was asked for; enables the line-count
    /// progress fallback.
    pub expected_total: Option<u64>,
    /// Count non-empty lines of the result file once the stage succeeds.
    pub count_results: bool,
}

impl fmt::Debug for StageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageSpec")
            .field("id", &self.id)
            .field("worker", &self.worker.name())
            .field("args", &self.args)
            .field("result", &self.result)
            .field("success_message", &self.success_message)
            .field("expected_total", &self.expected_total)
            .field("count_results", &self.count_results)
            .finish()
    }
}

impl StageSpec {
    pub fn new(id: StageId, worker: Arc<dyn WorkerPlugin>, args: WorkerStartArgs) -> Self {
        Self {
            id,
            worker,
            args,
            result: None,
            success_message: format!("{id} finished"),
            expected_total: None,
            count_results: false,
        }
    }

    pub fn with_result(mut self, target: ResultTarget) -> Self {
        self.result = Some(target);
        self
    }

    pub fn with_success_message(mut self, msg: impl Into<String>) -> Self {
        self.success_message = msg.into();
        self
    }

    pub fn with_expected_total(mut self, total: u64) -> Self {
        self.expected_total = Some(total);
        self
    }

    pub fn counting_results(mut self) -> Self {
        self.count_results = true;
        self
    }
}

/// Ordered stages plus the optional trailing stage.
#[derive(Debug, Clone, Default)]
pub struct PipelinePlan {
    pub stages: Vec<StageSpec>,
    pub trailing: Option<StageSpec>,
}

impl PipelinePlan {
    pub fn new(stages: Vec<StageSpec>) -> Self {
        Self {
            stages,
            trailing: None,
        }
    }

    /// The gate is evaluated here, once, before the run starts.
    pub fn with_trailing(mut self, stage: StageSpec, enabled: bool) -> Self {
        self.trailing = enabled.then_some(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len() + usize::from(self.trailing.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<StageId> {
        self.iter().map(|s| s.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageSpec> {
        self.stages.iter().chain(self.trailing.as_ref())
    }
}

/// Outcome of one stage. Produced exactly once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub stage: StageId,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub error: Option<StageError>,
    pub outputs: Vec<PathBuf>,
}

impl StageResult {
    pub fn succeeded(stage: StageId, exit_code: i32, outputs: Vec<PathBuf>) -> Self {
        Self {
            stage,
            success: true,
            exit_code: Some(exit_code),
            error: None,
            outputs,
        }
    }

    pub fn failed(
        stage: StageId,
        exit_code: Option<i32>,
        error: StageError,
        outputs: Vec<PathBuf>,
    ) -> Self {
        Self {
            stage,
            success: false,
            exit_code,
            error: Some(error),
            outputs,
        }
    }
}

/// Sequencer state machine.
///
/// `Idle → Running(i) → {Running(i+1) | Failed | Completed}`; the terminal
/// states re-arm the orchestrator to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running { stage: usize },
    Completed,
    Failed,
}

impl RunState {
    pub fn start() -> Self {
        RunState::Running { stage: 0 }
    }

    /// Transition after the current stage produced its result.
    pub fn after_stage(self, success: bool, total: usize) -> Self {
        match self {
            RunState::Running { .. } if !success => RunState::Failed,
            RunState::Running { stage } if stage + 1 < total => {
                RunState::Running { stage: stage + 1 }
            }
            RunState::Running { .. } => RunState::Completed,
            other => other,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::Running { stage } => write!(f, "running stage {stage}"),
            RunState::Completed => f.write_str("completed"),
            RunState::Failed => f.write_str("failed"),
        }
    }
}

/// Final account of one run, returned by `RunHandle::wait`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: String,
    pub state: RunState,
    pub results: Vec<StageResult>,
    /// Items counted in the extraction result, when that stage succeeded.
    pub items: Option<u64>,
    pub error: Option<String>,
}

impl RunReport {
    pub fn result(&self, stage: StageId) -> Option<&StageResult> {
        self.results.iter().find(|r| r.stage == stage)
    }

    pub fn launched(&self) -> Vec<StageId> {
        self.results.iter().map(|r| r.stage).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_advances_and_terminates() {
        let s = RunState::start();
        let s = s.after_stage(true, 3);
        assert_eq!(s, RunState::Running { stage: 1 });
        let s = s.after_stage(true, 3);
        assert_eq!(s, RunState::Running { stage: 2 });
        let s = s.after_stage(true, 3);
        assert_eq!(s, RunState::Completed);
        assert!(s.is_terminal());
    }

    #[test]
    fn failure_is_terminal_from_any_stage() {
        let s = RunState::Running { stage: 1 }.after_stage(false, 3);
        assert_eq!(s, RunState::Failed);
        assert_eq!(s.after_stage(true, 3), RunState::Failed);
        assert!(!RunState::Idle.is_terminal());
    }
}
