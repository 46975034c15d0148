use crate::config::PipelineConfig;
use crate::events::PipelineEvent;
use crate::output::OutputMux;

use super::count::count_non_empty_lines;
use super::stage::run_stage;
use super::types::{PipelinePlan, RunState, StageResult};

/// Mutable state of the one live run. Owned by the sequencer task only.
#[derive(Debug)]
pub(crate) struct RunContext {
    pub run_id: String,
    pub state: RunState,
    pub results: Vec<StageResult>,
    pub items: Option<u64>,
    pub error: Option<String>,
}

impl RunContext {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            state: RunState::Idle,
            results: Vec::new(),
            items: None,
            error: None,
        }
    }

    pub fn success(&self) -> bool {
        self.state == RunState::Completed
    }
}

/// Runs every planned stage in order and stops at the first failure.
///
/// A stage never starts before the previous stage's result is final, and
/// the trailing stage only runs when it was enabled at planning time.
pub(crate) async fn run_pipeline(
    plan: &PipelinePlan,
    mux: &mut OutputMux,
    settings: &PipelineConfig,
    ctx: &mut RunContext,
) {
    let total = plan.len();
    ctx.state = if total == 0 {
        RunState::Completed
    } else {
        RunState::start()
    };

    for spec in plan.iter() {
        let result = run_stage(spec, mux, settings).await;
        mux.events().emit(PipelineEvent::StageFinished {
            stage: result.stage,
            success: result.success,
        });

        let success = result.success;
        if !success {
            ctx.error = result
                .error
                .as_ref()
                .map(|e| format!("{} {e}", result.stage));
        }
        let counted = success && spec.count_results;
        let outputs = result.outputs.clone();
        ctx.results.push(result);
        ctx.state = ctx.state.after_stage(success, total);

        if counted {
            ctx.items = Some(count_items(mux, &outputs).await);
        }
        if !success {
            break;
        }
    }

    mux.clear_stage();
    match ctx.state {
        RunState::Completed => mux.status("✓ Pipeline completed").await,
        RunState::Failed => mux.failure("✗ Pipeline failed").await,
        other => tracing::warn!(state = %other, "pipeline ended in a non-terminal state"),
    }
}

/// Post-processing only: a read error is reported as zero, never a failure.
async fn count_items(mux: &mut OutputMux, outputs: &[std::path::PathBuf]) -> u64 {
    let Some(path) = outputs.first() else {
        mux.events().emit(PipelineEvent::ItemCount { count: 0 });
        return 0;
    };
    let n = match count_non_empty_lines(path).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error.kind = "count.read", path = %path.display(), error = %e);
            mux.failure(format!("✗ Error counting puzzles: {e}")).await;
            0
        }
    };
    mux.events().emit(PipelineEvent::ItemCount { count: n });
    n
}
