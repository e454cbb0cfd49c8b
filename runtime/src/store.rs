//! On-disk environment record store.
//!
//! Each environment lives in its own directory named by its UUID and holds a
//! single YAML record:
//!
//! ```text
//! <root>/<uuid>/config.yaml
//! ```
//!
//! Writes are atomic (write to tmp file, then rename). There is no locking;
//! the last writer wins.

use std::path::{Path, PathBuf};

use epi_core::config::CONFIG_FILE_NAME;
use epi_core::environment::Environment;
use epi_core::error::{EpiError, Result};
use uuid::Uuid;

/// Persistent store for environment records.
#[derive(Debug, Clone)]
pub struct EnvironmentStore {
    /// Directory holding one subdirectory per environment.
    root: PathBuf,
}

impl EnvironmentStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one environment.
    pub fn environment_dir(&self, id: &Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Record file of one environment.
    pub fn record_path(&self, id: &Uuid) -> PathBuf {
        self.environment_dir(id).join(CONFIG_FILE_NAME)
    }

    /// Create a new environment with a fresh identifier and persist it.
    pub fn create(&self, name: &str) -> Result<Environment> {
        self.create_with_id(name, Uuid::new_v4())
    }

    fn create_with_id(&self, name: &str, id: Uuid) -> Result<Environment> {
        let environment = Environment::with_id(name, id);
        let dir = self.environment_dir(&environment.id);
        std::fs::create_dir_all(&dir).map_err(|e| EpiError::persistence(&dir, e))?;
        self.save(&environment)?;

        tracing::debug!(id = %environment.id, name, "Created environment");
        Ok(environment)
    }

    /// Persist an environment to its record file.
    ///
    /// Fails with `InvalidState` before touching the disk if the identifier
    /// is the nil UUID.
    pub fn save(&self, environment: &Environment) -> Result<()> {
        if environment.id.is_nil() {
            return Err(EpiError::InvalidState(format!(
                "unexpected UUID on save: {}",
                environment.id
            )));
        }

        let data = serde_yaml::to_string(environment)?;

        let dir = self.environment_dir(&environment.id);
        std::fs::create_dir_all(&dir).map_err(|e| EpiError::persistence(&dir, e))?;
        epi_core::fs::write_atomic(&self.record_path(&environment.id), data.as_bytes())
    }

    /// Load one environment by identifier.
    pub fn get(&self, id: &Uuid) -> Result<Environment> {
        let path = self.record_path(id);
        if !path.is_file() {
            return Err(EpiError::NotFound(format!(
                "environment {}: {} does not exist",
                id,
                path.display()
            )));
        }

        let data = std::fs::read_to_string(&path).map_err(|e| EpiError::persistence(&path, e))?;
        serde_yaml::from_str(&data).map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Incorrect environment record");
            EpiError::Deserialization(format!("{}: {}", path.display(), e))
        })
    }

    /// Load all environments, sorted by directory name.
    ///
    /// A subdirectory whose name is not a UUID aborts the whole listing.
    /// Directories with a missing or unparsable record are skipped.
    pub fn list(&self) -> Result<Vec<Environment>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EpiError::persistence(&self.root, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EpiError::persistence(&self.root, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| EpiError::persistence(entry.path(), e))?;
            if file_type.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        let ids = names
            .iter()
            .map(|name| {
                Uuid::parse_str(name).map_err(|e| {
                    tracing::warn!(directory = %name, "Directory name is not an environment id");
                    EpiError::InvalidIdentifier {
                        name: name.clone(),
                        reason: e.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut environments = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(&id) {
                Ok(environment) => environments.push(environment),
                Err(e @ (EpiError::NotFound(_) | EpiError::Deserialization(_))) => {
                    tracing::warn!(%id, error = %e, "Skipping environment");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(environments)
    }
}
