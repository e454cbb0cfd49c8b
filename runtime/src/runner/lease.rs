//! Scoped ownership of a job container.

use std::sync::Arc;

use epi_core::error::Result;

use crate::engine::{ContainerEngine, ContainerSpec};

/// A created container that must be removed.
///
/// Acquired by creating the container. Call `release` once the job is done;
/// a lease dropped without release (cancelled or panicking task) schedules
/// the removal on the current tokio runtime instead.
pub struct ContainerLease {
    engine: Arc<dyn ContainerEngine>,
    id: String,
    released: bool,
}

impl ContainerLease {
    /// Create a container from `spec`.
    pub async fn create(engine: Arc<dyn ContainerEngine>, spec: &ContainerSpec) -> Result<Self> {
        let id = engine.create_container(spec).await?;
        tracing::debug!(container = %id, image = %spec.image, "Created container");
        Ok(Self {
            engine,
            id,
            released: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Remove the container. A removal failure is logged, never returned.
    pub async fn release(mut self) {
        self.released = true;
        remove_logged(self.engine.as_ref(), &self.id).await;
    }
}

impl Drop for ContainerLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let engine = Arc::clone(&self.engine);
        let id = std::mem::take(&mut self.id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    remove_logged(engine.as_ref(), &id).await;
                });
            }
            Err(_) => {
                tracing::warn!(container = %id, "Container lease dropped outside a runtime; container left behind");
            }
        }
    }
}

async fn remove_logged(engine: &dyn ContainerEngine, id: &str) {
    match engine.remove_container(id).await {
        Ok(()) => tracing::debug!(container = %id, "Removed container"),
        Err(e) => tracing::warn!(container = %id, error = %e, "Failed to remove container"),
    }
}
