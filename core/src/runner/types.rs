use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Which output channel of a worker a line came from.
///
/// `Status` is not a worker channel: it tags banners and status markers
/// produced by the pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    #[serde(rename = "stdout")]
    Primary,
    #[serde(rename = "stderr")]
    Diagnostic,
    #[serde(rename = "status")]
    Status,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Primary => "stdout",
            Channel::Diagnostic => "stderr",
            Channel::Status => "status",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStartArgs {
    pub program: String,
    pub args: Vec<String>,
    pub envs: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
}

impl WorkerStartArgs {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The command as shown in banners: program and arguments joined by spaces.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a worker ended, as reported by `WorkerSession::wait`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub exit_code: i32,
    /// Fault raised inside an in-process worker, rendered with full context.
    pub fault: Option<String>,
}

impl WorkerOutcome {
    pub fn exited(exit_code: i32) -> Self {
        Self {
            exit_code,
            fault: None,
        }
    }

    pub fn faulted(detail: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            fault: Some(detail.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.fault.is_none()
    }
}
