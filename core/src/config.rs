//! Home directory layout and the user configuration file.
//!
//! Everything lives under `~/.e/` unless `EPI_HOME` points elsewhere:
//!
//! ```text
//! ~/.e/
//!   config.yaml            user configuration (current environment)
//!   environments/<uuid>/   one record directory per environment
//!   mounts/                default root for job bind mounts
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EpiError, Result};

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "EPI_HOME";

/// Name of the directory under the user's home.
pub const DEFAULT_HOME_DIR: &str = ".e";

/// File name of both the user config and each environment record.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

const ENVIRONMENTS_DIR: &str = "environments";
const MOUNTS_DIR: &str = "mounts";

/// Resolved home directory layout. Resolved once at startup and passed down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpiHome {
    root: PathBuf,
}

impl EpiHome {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve from `EPI_HOME`, falling back to `~/.e`.
    pub fn resolve() -> Self {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Self::new(dir);
        }
        let root = dirs::home_dir()
            .map(|h| h.join(DEFAULT_HOME_DIR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME_DIR));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root of the environment record store.
    pub fn environments_dir(&self) -> PathBuf {
        self.root.join(ENVIRONMENTS_DIR)
    }

    /// Default host directory for job bind mounts.
    pub fn mounts_dir(&self) -> PathBuf {
        self.root.join(MOUNTS_DIR)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Create the home, store and mount directories.
    pub fn ensure(&self) -> Result<()> {
        for dir in [self.root.clone(), self.environments_dir(), self.mounts_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| EpiError::persistence(&dir, e))?;
        }
        Ok(())
    }
}

/// User configuration stored in `config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserConfig {
    pub version: String,

    pub kind: String,

    /// Environment used when a command does not name one.
    #[serde(default)]
    pub current_environment: Option<Uuid>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
            kind: "Config".to_string(),
            current_environment: None,
        }
    }
}

impl UserConfig {
    /// Load from `path`, returning defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|e| EpiError::persistence(path, e))?;
        serde_yaml::from_str(&data)
            .map_err(|e| EpiError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save to `path` (atomic write).
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::fs::write_atomic(path, data.as_bytes())
    }

    /// The current environment, or a config error if none is selected.
    pub fn require_current(&self) -> Result<Uuid> {
        self.current_environment.ok_or_else(|| {
            EpiError::Config("no current environment selected".to_string())
        })
    }
}
