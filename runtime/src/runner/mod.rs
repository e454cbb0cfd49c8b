//! Container job runner.
//!
//! Runs one job in a fresh container, strictly in sequence:
//! create → start → follow logs → wait → remove. There are no retries.
//! Removal is attempted on every path once the container exists, and a
//! removal failure never replaces the job's own result.

mod lease;

pub use lease::ContainerLease;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use epi_core::error::{EpiError, Result};
use epi_core::job::Job;
use epi_core::log::LogStream;
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::engine::{ContainerEngine, ContainerSpec};
use crate::log::JobLogWriter;
use crate::pull::ImagePuller;

/// Job runner settings.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Pull the job image before creating the container.
    pub pull_first: bool,
    /// Upper bound for the whole job, including the pull when `pull_first`
    /// is set. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Also append container output as JSON lines to this file.
    pub log_file: Option<PathBuf>,
}

/// How a job run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub container_id: String,
    pub exit_code: i64,
}

impl JobOutcome {
    /// Whether the command exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs jobs through a container engine.
pub struct JobRunner {
    engine: Arc<dyn ContainerEngine>,
    config: RunnerConfig,
}

impl JobRunner {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self::with_config(engine, RunnerConfig::default())
    }

    pub fn with_config(engine: Arc<dyn ContainerEngine>, config: RunnerConfig) -> Self {
        Self { engine, config }
    }

    /// Run `job`, relaying container stdout and stderr to the given sinks.
    ///
    /// A non-zero exit status is reported in the outcome, not as an error.
    pub async fn run<O, E>(&self, job: &Job, stdout: &mut O, stderr: &mut E) -> Result<JobOutcome>
    where
        O: AsyncWrite + Unpin + Send,
        E: AsyncWrite + Unpin + Send,
    {
        let deadline = self.config.timeout.map(|limit| (Instant::now() + limit, limit));

        if self.config.pull_first {
            ImagePuller::new(Arc::clone(&self.engine))
                .with_timeout(self.config.timeout)
                .pull(&job.image)
                .await
                .into_result()?;
        }

        let spec = ContainerSpec::from_job(job);
        let lease = ContainerLease::create(Arc::clone(&self.engine), &spec).await?;

        let result = match deadline {
            Some((deadline, limit)) => {
                match tokio::time::timeout_at(deadline, self.drive(lease.id(), stdout, stderr))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(EpiError::Timeout(format!(
                        "job in container {} exceeded {:?}",
                        lease.id(),
                        limit
                    ))),
                }
            }
            None => self.drive(lease.id(), stdout, stderr).await,
        };

        lease.release().await;
        result
    }

    async fn drive<O, E>(&self, id: &str, stdout: &mut O, stderr: &mut E) -> Result<JobOutcome>
    where
        O: AsyncWrite + Unpin + Send,
        E: AsyncWrite + Unpin + Send,
    {
        self.engine.start_container(id).await?;
        tracing::debug!(container = %id, "Started container");

        let mut log = match &self.config.log_file {
            Some(path) => {
                let writer = JobLogWriter::open(path).await?;
                tracing::debug!(
                    container = %id,
                    path = %writer.path().display(),
                    "Capturing job output"
                );
                Some(writer)
            }
            None => None,
        };

        let mut output = self.engine.logs(id).await?;
        while let Some(chunk) = output.next().await {
            let chunk = chunk?;
            let written = match chunk.stream {
                LogStream::Stdout => stdout.write_all(&chunk.bytes).await,
                LogStream::Stderr => stderr.write_all(&chunk.bytes).await,
            };
            written.map_err(|e| {
                EpiError::Execution(format!("relaying container {}: {}", chunk.stream, e))
            })?;
            if let Some(log) = log.as_mut() {
                log.append(&chunk).await?;
            }
        }

        stdout
            .flush()
            .await
            .map_err(|e| EpiError::Execution(format!("flushing stdout: {e}")))?;
        stderr
            .flush()
            .await
            .map_err(|e| EpiError::Execution(format!("flushing stderr: {e}")))?;
        if let Some(log) = log.as_mut() {
            log.flush().await?;
        }

        let exit_code = self.engine.wait_container(id).await?;
        tracing::debug!(container = %id, exit_code, "Container finished");
        Ok(JobOutcome {
            container_id: id.to_string(),
            exit_code,
        })
    }
}
