#[allow(clippy::module_inception)]
pub mod error;
pub mod stage;

pub use error::{CliError, ConfigError, RunnerError, StartError};
pub use stage::StageError;
