//! Job descriptors for one containerized command run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::environment::InstalledComponentVersion;
use crate::error::Result;

/// A transient request to run one command in a fresh container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub image: String,
    pub command: String,
    pub args: Vec<String>,
    /// Working directory inside the container.
    pub workdir: String,
    /// Mount paths; each is bound from `mount_root` to the same path in the container.
    pub mounts: Vec<String>,
    /// Host directory the mounts are resolved against.
    pub mount_root: PathBuf,
    pub env: BTreeMap<String, String>,
}

/// A host directory bound into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub source: PathBuf,
    pub target: String,
}

impl Job {
    /// Build a job for one of a component's commands.
    pub fn for_command(
        component: &InstalledComponentVersion,
        command_name: &str,
        mount_root: impl Into<PathBuf>,
    ) -> Result<Self> {
        let command = component.find_command(command_name)?;
        Ok(Self {
            image: component.image.clone(),
            command: command.command.clone(),
            args: command.args.clone(),
            workdir: component.workdir.clone(),
            mounts: component.mounts.clone(),
            mount_root: mount_root.into(),
            env: command.envs.clone(),
        })
    }

    /// Environment variables as `KEY=VALUE`, sorted by key.
    pub fn env_list(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// The command followed by its arguments.
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.command.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Bind mounts: `mount_root/<m>` on the host to `<m>` in the container.
    pub fn bind_mounts(&self) -> Vec<BindMount> {
        self.mounts
            .iter()
            .map(|m| BindMount {
                source: join_under(&self.mount_root, m),
                target: m.clone(),
            })
            .collect()
    }
}

/// Join `path` under `root` even when `path` is absolute.
fn join_under(root: &Path, path: &str) -> PathBuf {
    root.join(path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::InstalledComponentCommand;

    fn job() -> Job {
        Job {
            image: "alpine:3".to_string(),
            command: "echo".to_string(),
            args: vec!["hi".to_string(), "there".to_string()],
            workdir: "/work".to_string(),
            mounts: vec!["/shared".to_string(), "data".to_string()],
            mount_root: PathBuf::from("/home/op/.e/mounts"),
            env: BTreeMap::from([
                ("B".to_string(), "2".to_string()),
                ("A".to_string(), "1".to_string()),
            ]),
        }
    }

    #[test]
    fn test_command_line() {
        assert_eq!(job().command_line(), vec!["echo", "hi", "there"]);
    }

    #[test]
    fn test_command_line_without_args() {
        let mut j = job();
        j.args.clear();
        assert_eq!(j.command_line(), vec!["echo"]);
    }

    #[test]
    fn test_env_list_sorted() {
        assert_eq!(job().env_list(), vec!["A=1", "B=2"]);
    }

    #[test]
    fn test_bind_mounts_same_target_path() {
        let mounts = job().bind_mounts();
        assert_eq!(
            mounts,
            vec![
                BindMount {
                    source: PathBuf::from("/home/op/.e/mounts/shared"),
                    target: "/shared".to_string(),
                },
                BindMount {
                    source: PathBuf::from("/home/op/.e/mounts/data"),
                    target: "data".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_for_command() {
        let component = InstalledComponentVersion {
            name: "azbi".to_string(),
            image: "epiphanyplatform/azbi:0.1.0".to_string(),
            workdir: "/workdir".to_string(),
            mounts: vec!["/shared".to_string()],
            commands: vec![InstalledComponentCommand {
                name: "apply".to_string(),
                command: "make".to_string(),
                args: vec!["apply".to_string()],
                envs: BTreeMap::from([("M_NAME".to_string(), "x".to_string())]),
                ..Default::default()
            }],
            ..Default::default()
        };

        let j = Job::for_command(&component, "apply", "/root").unwrap();
        assert_eq!(j.image, "epiphanyplatform/azbi:0.1.0");
        assert_eq!(j.command_line(), vec!["make", "apply"]);
        assert_eq!(j.workdir, "/workdir");
        assert_eq!(j.env_list(), vec!["M_NAME=x"]);
        assert_eq!(j.bind_mounts()[0].source, PathBuf::from("/root/shared"));

        assert!(Job::for_command(&component, "destroy", "/root").is_err());
    }
}
