use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// How a stage treats its declared result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Start from an empty file.
    Truncate,
    /// Keep existing content; lines written before a failure survive.
    Append,
    /// Write to a `.part` sibling, renamed over the target only on success.
    CommitOnSuccess,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTarget {
    pub path: PathBuf,
    pub mode: WriteMode,
}

impl ResultTarget {
    pub fn new(path: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }
}

pub struct ResultWriter {
    target: ResultTarget,
    staging: Option<PathBuf>,
    file: BufWriter<File>,
    lines: u64,
}

impl ResultWriter {
    pub async fn open(target: ResultTarget) -> std::io::Result<Self> {
        if let Some(dir) = target.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut opts = tokio::fs::OpenOptions::new();
        opts.create(true);
        let (open_path, staging) = match target.mode {
            WriteMode::Truncate => {
                opts.write(true).truncate(true);
                (target.path.clone(), None)
            }
            WriteMode::Append => {
                opts.append(true);
                (target.path.clone(), None)
            }
            WriteMode::CommitOnSuccess => {
                opts.write(true).truncate(true);
                let part = staging_path(&target.path);
                (part.clone(), Some(part))
            }
        };
        let file = opts.open(&open_path).await?;
        Ok(Self {
            target,
            staging,
            file: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.target.path
    }

    pub async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.file.write_all(line.as_bytes()).await?;
        self.file.write_all(b"\n").await?;
        self.lines += 1;
        Ok(())
    }

    /// Flushes and settles the file for the stage outcome. Returns the
    /// number of lines written.
    pub async fn finish(mut self, success: bool) -> std::io::Result<u64> {
        let flushed = self.file.flush().await;
        drop(self.file);
        let Some(part) = self.staging else {
            return flushed.map(|_| self.lines);
        };
        if success && flushed.is_ok() {
            tokio::fs::rename(&part, &self.target.path).await?;
            return Ok(self.lines);
        }
        let _ = tokio::fs::remove_file(&part).await;
        flushed.map(|_| self.lines)
    }
}

pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
