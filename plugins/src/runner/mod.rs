pub mod process;

pub use process::ProcessWorkerPlugin;
