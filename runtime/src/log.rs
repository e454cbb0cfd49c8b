//! Job log capture: appends container output as structured JSON lines.

use std::path::{Path, PathBuf};

use epi_core::error::{EpiError, Result};
use epi_core::log::LogEntry;
use tokio::io::AsyncWriteExt;

use crate::engine::LogChunk;

/// Appends Docker-compatible JSON log lines to a file.
pub struct JobLogWriter {
    path: PathBuf,
    file: tokio::fs::File,
}

impl JobLogWriter {
    /// Open `path` for appending, creating it and its parent directory.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EpiError::persistence(parent, e))?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| EpiError::persistence(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Append one chunk of output as a log entry.
    pub async fn append(&mut self, chunk: &LogChunk) -> Result<()> {
        let entry = LogEntry::now(chunk.stream, &chunk.bytes);
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        self.file
            .write_all(&line)
            .await
            .map_err(|e| EpiError::persistence(&self.path, e))
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.file
            .flush()
            .await
            .map_err(|e| EpiError::persistence(&self.path, e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
