//! Container engine abstraction.
//!
//! The job runner and image puller only need a small capability set from the
//! container runtime: pull, create, start, follow logs, wait, remove.
//! `DockerEngine` implements it against a local or remote Docker daemon.

mod docker;

pub use docker::DockerEngine;

use async_trait::async_trait;
use epi_core::error::Result;
use epi_core::job::{BindMount, Job};
use epi_core::log::LogStream;
use futures::stream::BoxStream;

/// Raw bytes of an image pull progress stream (newline-delimited JSON).
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// Demultiplexed container output.
pub type OutputStream = BoxStream<'static, Result<LogChunk>>;

/// One chunk of container output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub stream: LogStream,
    pub bytes: Vec<u8>,
}

impl LogChunk {
    pub fn stdout(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            stream: LogStream::Stdout,
            bytes: bytes.into(),
        }
    }

    pub fn stderr(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            stream: LogStream::Stderr,
            bytes: bytes.into(),
        }
    }
}

/// Everything needed to create a job container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    /// Command followed by its arguments.
    pub cmd: Vec<String>,
    pub workdir: String,
    /// `KEY=VALUE` pairs.
    pub env: Vec<String>,
    pub mounts: Vec<BindMount>,
}

impl ContainerSpec {
    pub fn from_job(job: &Job) -> Self {
        Self {
            image: job.image.clone(),
            cmd: job.command_line(),
            workdir: job.workdir.clone(),
            env: job.env_list(),
            mounts: job.bind_mounts(),
        }
    }
}

/// Container runtime capabilities used by the job runner and image puller.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Start pulling an image and return its progress stream.
    async fn pull_image(&self, image: &str) -> Result<ByteStream>;

    /// Create a container and return its id.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    async fn start_container(&self, id: &str) -> Result<()>;

    /// Follow combined stdout/stderr until the container's output ends.
    async fn logs(&self, id: &str) -> Result<OutputStream>;

    /// Wait for the container to exit and return its exit code.
    async fn wait_container(&self, id: &str) -> Result<i64>;

    async fn remove_container(&self, id: &str) -> Result<()>;
}
