//! Environment and installed component types.
//!
//! An environment is a named collection of installed components. It is
//! persisted as a single YAML record; the field order of these structs is the
//! field order of that record.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EpiError, Result};

/// A named, uniquely identified collection of installed components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Human-supplied label. Not unique, may be empty.
    pub name: String,

    /// Identifier assigned at creation.
    #[serde(rename = "uuid")]
    pub id: Uuid,

    /// Installed components in insertion order.
    #[serde(default)]
    pub installed: Vec<InstalledComponentVersion>,
}

/// One component instance bound to its owning environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstalledComponentVersion {
    /// Identifier of the owning environment.
    pub environment_ref: Uuid,

    pub name: String,

    /// Free-form classification tag (e.g. execution backend).
    #[serde(rename = "type")]
    pub component_type: String,

    pub version: String,

    /// Image used to run this component's commands.
    pub image: String,

    /// Working directory inside the container.
    pub workdir: String,

    /// Paths bound from the mount root into the container at the same path.
    #[serde(default)]
    pub mounts: Vec<String>,

    #[serde(default)]
    pub commands: Vec<InstalledComponentCommand>,
}

/// A named command a component exposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstalledComponentCommand {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub command: String,

    #[serde(default)]
    pub envs: BTreeMap<String, String>,

    #[serde(default)]
    pub args: Vec<String>,
}

impl Environment {
    /// Create an in-memory environment with a fresh identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(name, Uuid::new_v4())
    }

    /// Create an in-memory environment with the given identifier.
    pub fn with_id(name: impl Into<String>, id: Uuid) -> Self {
        Self {
            name: name.into(),
            id,
            installed: Vec::new(),
        }
    }

    /// Find an installed component by exact name.
    ///
    /// Duplicate names resolve to the first entry.
    pub fn find_component(&self, name: &str) -> Result<&InstalledComponentVersion> {
        self.installed
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| EpiError::NotFound("no such component installed".to_string()))
    }

    /// Append a component, binding it to this environment.
    pub fn add_component(&mut self, mut component: InstalledComponentVersion) {
        component.environment_ref = self.id;
        self.installed.push(component);
    }

    /// Remove the first component with the given name and return it.
    pub fn remove_component(&mut self, name: &str) -> Result<InstalledComponentVersion> {
        let index = self
            .installed
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| EpiError::NotFound("no such component installed".to_string()))?;
        Ok(self.installed.remove(index))
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " Name: {}", self.name)?;
        writeln!(f, " UUID: {}", self.id)?;
        for component in &self.installed {
            writeln!(f, "  - {} {} ({})", component.name, component.version, component.image)?;
        }
        Ok(())
    }
}

impl InstalledComponentVersion {
    /// Find one of this component's commands by name.
    pub fn find_command(&self, name: &str) -> Result<&InstalledComponentCommand> {
        self.commands.iter().find(|c| c.name == name).ok_or_else(|| {
            EpiError::NotFound(format!(
                "component '{}' has no command '{}'",
                self.name, name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_ID: &str = "10d52c05-029e-4794-a790-79d6c2af40b6";

    fn component(name: &str, version: &str) -> InstalledComponentVersion {
        InstalledComponentVersion {
            environment_ref: Uuid::parse_str(ENV_ID).unwrap(),
            name: name.to_string(),
            component_type: "docker".to_string(),
            version: version.to_string(),
            image: format!("registry/{name}:{version}"),
            ..Default::default()
        }
    }

    fn env_with(components: Vec<InstalledComponentVersion>) -> Environment {
        Environment {
            name: "e1".to_string(),
            id: Uuid::parse_str(ENV_ID).unwrap(),
            installed: components,
        }
    }

    #[test]
    fn test_find_component_single() {
        let env = env_with(vec![component("c1", "v1")]);
        let found = env.find_component("c1").unwrap();
        assert_eq!(found, &component("c1", "v1"));
    }

    #[test]
    fn test_find_component_among_many() {
        let env = env_with(vec![component("c1", "v1"), component("c2", "v2")]);
        assert_eq!(env.find_component("c1").unwrap().version, "v1");
        assert_eq!(env.find_component("c2").unwrap().version, "v2");
    }

    #[test]
    fn test_find_component_missing() {
        let env = env_with(vec![component("c2", "v2")]);
        let err = env.find_component("c1").unwrap_err();
        assert!(matches!(err, EpiError::NotFound(_)));
        assert!(err.to_string().contains("no such component installed"));
    }

    #[test]
    fn test_find_component_empty() {
        let env = env_with(vec![]);
        assert!(matches!(
            env.find_component("c1"),
            Err(EpiError::NotFound(_))
        ));
    }

    #[test]
    fn test_find_component_is_case_sensitive() {
        let env = env_with(vec![component("c1", "v1")]);
        assert!(env.find_component("C1").is_err());
    }

    #[test]
    fn test_find_component_first_match_wins() {
        let env = env_with(vec![component("c1", "v1"), component("c1", "v2")]);
        assert_eq!(env.find_component("c1").unwrap().version, "v1");
    }

    #[test]
    fn test_add_component_binds_environment() {
        let mut env = Environment::new("e1");
        let mut c = component("c1", "v1");
        c.environment_ref = Uuid::nil();
        env.add_component(c);
        assert_eq!(env.installed[0].environment_ref, env.id);
    }

    #[test]
    fn test_remove_component() {
        let mut env = env_with(vec![component("c1", "v1"), component("c2", "v2")]);
        let removed = env.remove_component("c1").unwrap();
        assert_eq!(removed.name, "c1");
        assert_eq!(env.installed.len(), 1);
        assert_eq!(env.installed[0].name, "c2");
        assert!(env.remove_component("c1").is_err());
    }

    #[test]
    fn test_find_command() {
        let mut c = component("c1", "v1");
        c.commands.push(InstalledComponentCommand {
            name: "apply".to_string(),
            command: "/bin/apply".to_string(),
            ..Default::default()
        });
        assert_eq!(c.find_command("apply").unwrap().command, "/bin/apply");
        assert!(matches!(c.find_command("destroy"), Err(EpiError::NotFound(_))));
    }

    #[test]
    fn test_display() {
        let env = env_with(vec![]);
        assert_eq!(env.to_string(), format!(" Name: e1\n UUID: {ENV_ID}\n"));
    }

    #[test]
    fn test_missing_installed_loads_as_empty() {
        let yaml = format!("name: e1\nuuid: {ENV_ID}\n");
        let env: Environment = serde_yaml::from_str(&yaml).unwrap();
        assert!(env.installed.is_empty());
    }
}
