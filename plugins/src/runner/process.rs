use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

use puzzler_core::runner::{WorkerOutcome, WorkerPlugin, WorkerSession, WorkerStartArgs};

/// Runs a stage as a child process: stdout is the primary channel, stderr
/// the diagnostic channel.
pub struct ProcessWorkerPlugin {}

impl ProcessWorkerPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for ProcessWorkerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerPlugin for ProcessWorkerPlugin {
    fn name(&self) -> &str {
        "process"
    }

    async fn start_session(&self, args: &WorkerStartArgs) -> Result<Box<dyn WorkerSession>> {
        let mut cmd = Command::new(&args.program);
        cmd.args(&args.args)
            .envs(&args.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // No orphans if the stage (or the whole tool) goes away early.
            .kill_on_drop(true);
        if let Some(dir) = &args.cwd {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().with_context(|| args.program.clone())?;
        tracing::debug!(program = %args.program, pid = ?child.id(), "worker.spawned");

        Ok(Box::new(ProcessWorkerSession { child }))
    }
}

struct ProcessWorkerSession {
    child: Child,
}

#[async_trait]
impl WorkerSession for ProcessWorkerSession {
    fn primary(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn diagnostic(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn wait(&mut self) -> Result<WorkerOutcome> {
        let status = self.child.wait().await?;
        // Killed by a signal: no exit code.
        Ok(WorkerOutcome::exited(status.code().unwrap_or(-1)))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn read_all(mut rd: Box<dyn AsyncRead + Unpin + Send>) -> String {
        let mut s = String::new();
        rd.read_to_string(&mut s).await.unwrap();
        s
    }

    #[tokio::test]
    async fn exposes_both_channels_and_exit_code() {
        let plugin = ProcessWorkerPlugin::new();
        let mut args = WorkerStartArgs::new("sh").args([
            "-c",
            "echo \"$GREETING\"; echo 50% >&2; exit 3",
        ]);
        args.envs.insert("GREETING".into(), "hello".into());

        let mut session = plugin.start_session(&args).await.unwrap();
        let out = session.primary().unwrap();
        let err = session.diagnostic().unwrap();
        let (out, err) = tokio::join!(read_all(out), read_all(err));

        assert_eq!(out, "hello\n");
        assert_eq!(err, "50%\n");
        let outcome = session.wait().await.unwrap();
        assert_eq!(outcome.exit_code, 3);
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn missing_binary_fails_to_start() {
        let plugin = ProcessWorkerPlugin::new();
        let err = plugin
            .start_session(&WorkerStartArgs::new("/nonexistent/fairy-stockfish-worker"))
            .await
            .err()
            .expect("spawn should fail");
        assert!(format!("{err:#}").starts_with("/nonexistent/fairy-stockfish-worker: "));
    }

    #[tokio::test]
    async fn runs_in_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = WorkerStartArgs::new("sh").args(["-c", "pwd"]);
        args.cwd = Some(dir.path().to_path_buf());

        let mut session = ProcessWorkerPlugin::new().start_session(&args).await.unwrap();
        let out = read_all(session.primary().unwrap()).await;
        let expected = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(std::fs::canonicalize(out.trim()).unwrap(), expected);
        assert!(session.wait().await.unwrap().success());
    }
}
