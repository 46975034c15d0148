mod app_log;
mod mux;
mod result_file;

pub use app_log::AppLog;
pub use mux::OutputMux;
pub use result_file::{staging_path, ResultTarget, ResultWriter, WriteMode};
