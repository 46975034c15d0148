//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `puzzler_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load, load_default, AppConfig, EngineOptions, LoggingConfig, PipelineConfig, RunConfig,
    RunForm, WorkersConfig,
};
pub use crate::error::{CliError, ConfigError, RunnerError, StageError, StartError};
pub use crate::events::{EventSink, PipelineEvent};
pub use crate::output::{ResultTarget, WriteMode};
pub use crate::pipeline::{
    Orchestrator, PipelinePlan, RunHandle, RunReport, RunState, StageId, StagePlanner,
    StageResult, StageSpec,
};
pub use crate::runner::{
    Channel, InProcessIo, InProcessWorkerPlugin, ProgressReporter, WorkerOutcome, WorkerPlugin,
    WorkerSession, WorkerStartArgs,
};
