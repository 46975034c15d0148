use std::sync::Arc;

use puzzler_core::api::{AppConfig, Orchestrator, StagePlanner, WorkerPlugin};

use crate::plan::CommandPlanner;
use crate::runner::ProcessWorkerPlugin;

pub fn build_worker(_cfg: &AppConfig) -> Arc<dyn WorkerPlugin> {
    Arc::new(ProcessWorkerPlugin::new())
}

pub fn build_planner(cfg: &AppConfig) -> Arc<dyn StagePlanner> {
    Arc::new(CommandPlanner::new(cfg.workers.clone(), build_worker(cfg)))
}

pub fn build_orchestrator(cfg: &AppConfig) -> Orchestrator {
    Orchestrator::new(build_planner(cfg), cfg.pipeline.clone())
}
