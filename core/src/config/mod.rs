mod load;
mod run;
mod types;

pub use load::{get_puzzler_data_dir, load, load_default};
pub use run::{variant_from_eval_file, EngineOptions, RunConfig, RunForm};
pub use types::{
    AppConfig, EngineConfig, GeneratorConfig, LoggingConfig, PgnConfig, PipelineConfig,
    PuzzlerConfig, WorkersConfig,
};
