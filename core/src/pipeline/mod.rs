mod count;
mod orchestrator;
mod planner;
mod sequencer;
mod stage;
pub mod types;

pub use count::count_non_empty_lines;
pub use orchestrator::{Orchestrator, RunHandle};
pub use planner::StagePlanner;
pub use stage::run_stage;
pub use types::{PipelinePlan, RunReport, RunState, StageId, StageResult, StageSpec};
