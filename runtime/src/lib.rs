//! Epi Runtime - environment record store and containerized job execution.
//!
//! This crate provides the on-disk environment store, the container engine
//! abstraction with its Docker implementation, the image puller and the job
//! runner.

#![allow(clippy::result_large_err)]

pub mod engine;
pub mod log;
pub mod pull;
pub mod runner;
pub mod store;

#[cfg(test)]
mod testing;

// Re-export common types
pub use engine::{ContainerEngine, ContainerSpec, DockerEngine, LogChunk};
pub use pull::{ImagePuller, PullOutput};
pub use runner::{ContainerLease, JobOutcome, JobRunner, RunnerConfig};
pub use store::EnvironmentStore;

/// Epi Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
