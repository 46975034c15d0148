use thiserror::Error;

/// Failure captured in a `StageResult`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// The worker never started; no drain tasks were created.
    #[error("failed to start: {0}")]
    Launch(String),
    #[error("command failed with code {code}")]
    Exit { code: i32, diagnostic_tail: String },
    /// Fault raised inside an in-process worker, with its full context chain.
    #[error("exception: {detail}")]
    Fault { detail: String },
    #[error("failed waiting for worker: {0}")]
    Wait(String),
}

impl StageError {
    /// Launch and runtime failures are the only kinds that abort a pipeline.
    pub fn is_launch(&self) -> bool {
        matches!(self, Self::Launch(_))
    }

    /// Human-readable failure line, prefixed with the failure marker.
    pub fn marker_line(&self) -> String {
        match self {
            Self::Launch(msg) => format!("✗ Failed to start: {msg}"),
            Self::Exit { code, .. } => format!("✗ Command failed with code {code}"),
            Self::Fault { detail } => format!("✗ Exception: {detail}"),
            Self::Wait(msg) => format!("✗ Wait failed: {msg}"),
        }
    }
}
