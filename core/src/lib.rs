//! Epi Core - environment model, job descriptors and shared types.
//!
//! This crate holds the data types shared by the runtime and the CLI:
//! environments and their installed components, job descriptors,
//! home directory layout and the error type.

pub mod config;
pub mod environment;
pub mod error;
pub mod fs;
pub mod job;
pub mod log;

// Re-export commonly used types
pub use config::{EpiHome, UserConfig};
pub use environment::{Environment, InstalledComponentCommand, InstalledComponentVersion};
pub use error::{EpiError, Result};
pub use job::{BindMount, Job};
pub use log::{LogEntry, LogStream, PullProgress};

/// Epi version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
