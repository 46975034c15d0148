use crate::config::RunConfig;
use crate::error::RunnerError;

use super::types::PipelinePlan;

/// Turns a validated run configuration into the ordered stage list.
///
/// Planning happens once per run, before any worker starts; the resulting
/// specs are immutable for the rest of the run.
pub trait StagePlanner: Send + Sync {
    fn plan(&self, cfg: &RunConfig) -> Result<PipelinePlan, RunnerError>;
}

impl<F> StagePlanner for F
where
    F: Fn(&RunConfig) -> Result<PipelinePlan, RunnerError> + Send + Sync,
{
    fn plan(&self, cfg: &RunConfig) -> Result<PipelinePlan, RunnerError> {
        self(cfg)
    }
}
