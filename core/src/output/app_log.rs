//! Durable application log, shared by every stage of a run.
//!
//! One task owns the file; everything else sends lines over a bounded
//! channel, so lines from the two pumps never interleave mid-line.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct AppLog {
    tx: Option<mpsc::Sender<String>>,
    task: Option<JoinHandle<()>>,
    failed: Arc<AtomicBool>,
}

impl AppLog {
    /// Opens `path` for append and starts the writer task.
    pub async fn open(path: &Path, capacity: usize) -> std::io::Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        let (tx, rx) = mpsc::channel::<String>(capacity.max(1));
        let failed = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(write_loop(
            BufWriter::new(file),
            rx,
            path.to_path_buf(),
            failed.clone(),
        ));

        Ok(Self {
            tx: Some(tx),
            task: Some(task),
            failed,
        })
    }

    /// A log that discards everything; used when the file cannot be opened.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            task: None,
            failed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub async fn write_line(&self, mut line: String) {
        let Some(tx) = &self.tx else {
            return;
        };
        if !line.ends_with('\n') {
            line.push('\n');
        }
        // writer gone
        let _ = tx.send(line).await;
    }

    /// Closes the channel and waits until every queued line is on disk.
    /// Returns true when a write failed and lines were lost.
    pub async fn close(mut self) -> bool {
        self.tx.take();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.failed.load(Ordering::Relaxed)
    }
}

async fn write_loop<W>(
    mut writer: BufWriter<W>,
    mut rx: mpsc::Receiver<String>,
    path: PathBuf,
    failed: Arc<AtomicBool>,
) where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        if failed.load(Ordering::Relaxed) {
            // Keep draining so senders never block on a dead log.
            continue;
        }
        let mut res = writer.write_all(line.as_bytes()).await;
        // Batch whatever is already queued before flushing.
        while res.is_ok() {
            match rx.try_recv() {
                Ok(more) => res = writer.write_all(more.as_bytes()).await,
                Err(_) => break,
            }
        }
        if res.is_ok() {
            res = writer.flush().await;
        }
        if let Err(e) = res {
            tracing::warn!(
                error.kind = "app_log.write",
                path = %path.display(),
                error = %e,
                "application log write failed; further lines are discarded"
            );
            failed.store(true, Ordering::Relaxed);
        }
    }
    let _ = writer.flush().await;
}
