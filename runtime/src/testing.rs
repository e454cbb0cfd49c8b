//! Scripted in-memory `ContainerEngine` for unit tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use epi_core::error::{EpiError, Result};
use futures::StreamExt;

use crate::engine::{ByteStream, ContainerEngine, ContainerSpec, LogChunk, OutputStream};

/// Engine whose behaviour is fixed by its public fields.
#[derive(Default)]
pub struct FakeEngine {
    /// Chunks emitted by `pull_image`.
    pub pull_chunks: Vec<Vec<u8>>,
    /// Emit an error after `pull_chunks`.
    pub pull_fails: bool,
    /// Reject `pull_image` before any progress.
    pub pull_rejected: bool,
    pub output: Vec<LogChunk>,
    /// Emit an error after `output`.
    pub output_fails: bool,
    /// Never end the output stream.
    pub output_hangs: bool,
    pub exit_code: i64,
    pub fail_create: bool,
    pub fail_start: bool,
    pub fail_remove: bool,
    /// Hold the pull stream open this long before the first chunk.
    pub pull_delay: Option<Duration>,

    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) created: Mutex<Vec<ContainerSpec>>,
    pub(crate) live: Mutex<HashSet<String>>,
}

impl FakeEngine {
    /// Names of the engine methods called, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Specs passed to `create_container`.
    pub fn created(&self) -> Vec<ContainerSpec> {
        self.created.lock().unwrap().clone()
    }

    /// Containers created and not yet removed.
    pub fn live(&self) -> HashSet<String> {
        self.live.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn pull_image(&self, image: &str) -> Result<ByteStream> {
        self.record("pull");
        if self.pull_rejected {
            return Err(EpiError::Execution(format!("pull access denied for {image}")));
        }
        let mut items: Vec<Result<Vec<u8>>> = self.pull_chunks.iter().cloned().map(Ok).collect();
        if self.pull_fails {
            items.push(Err(EpiError::Execution("unexpected EOF".to_string())));
        }
        let delay = self.pull_delay;
        let held = futures::stream::once(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        })
        .filter_map(|()| async { None::<Result<Vec<u8>>> });
        Ok(held.chain(futures::stream::iter(items)).boxed())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        self.record("create");
        if self.fail_create {
            return Err(EpiError::Execution(format!("no such image: {}", spec.image)));
        }
        let mut created = self.created.lock().unwrap();
        created.push(spec.clone());
        let id = format!("container-{}", created.len());
        self.live.lock().unwrap().insert(id.clone());
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.record("start");
        if self.fail_start {
            return Err(EpiError::Execution(format!("cannot start {id}")));
        }
        Ok(())
    }

    async fn logs(&self, _id: &str) -> Result<OutputStream> {
        self.record("logs");
        if self.output_hangs {
            return Ok(futures::stream::pending().boxed());
        }
        let mut items: Vec<Result<LogChunk>> = self.output.iter().cloned().map(Ok).collect();
        if self.output_fails {
            items.push(Err(EpiError::Execution("connection reset".to_string())));
        }
        Ok(futures::stream::iter(items).boxed())
    }

    async fn wait_container(&self, _id: &str) -> Result<i64> {
        self.record("wait");
        Ok(self.exit_code)
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        self.record("remove");
        if self.fail_remove {
            return Err(EpiError::Execution(format!("cannot remove {id}")));
        }
        self.live.lock().unwrap().remove(id);
        Ok(())
    }
}
