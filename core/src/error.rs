use thiserror::Error;

/// Epi error types
#[derive(Error, Debug)]
pub enum EpiError {
    /// A record or component does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A persisted record exists but cannot be parsed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Reading, writing or creating directories failed
    #[error("Persistence error: {path}: {source}")]
    Persistence {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Operation on an entity that lacks required identity
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A store directory name is not a well-formed environment identifier
    #[error("Invalid identifier: {name}: {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// The container runtime rejected an operation
    #[error("Execution error: {0}")]
    Execution(String),

    /// The container engine could not be reached
    #[error("Runtime connection error: {0}")]
    RuntimeConnection(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EpiError {
    /// Wrap an I/O error together with the path it occurred on.
    pub fn persistence(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        EpiError::Persistence {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

impl From<serde_json::Error> for EpiError {
    fn from(err: serde_json::Error) -> Self {
        EpiError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for EpiError {
    fn from(err: serde_yaml::Error) -> Self {
        EpiError::Serialization(err.to_string())
    }
}

/// Result type alias for epi operations
pub type Result<T> = std::result::Result<T, EpiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let error = EpiError::NotFound("no such component installed".to_string());
        assert_eq!(error.to_string(), "Not found: no such component installed");
    }

    #[test]
    fn test_persistence_display_includes_path() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = EpiError::persistence("/tmp/envs/config.yaml", io);
        assert_eq!(
            error.to_string(),
            "Persistence error: /tmp/envs/config.yaml: denied"
        );
    }

    #[test]
    fn test_invalid_identifier_display() {
        let error = EpiError::InvalidIdentifier {
            name: "incorrect-directory-name".to_string(),
            reason: "invalid length".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid identifier: incorrect-directory-name: invalid length"
        );
    }

    #[test]
    fn test_execution_error_display() {
        let error = EpiError::Execution("no such image".to_string());
        assert_eq!(error.to_string(), "Execution error: no such image");
    }

    #[test]
    fn test_serde_yaml_error_conversion() {
        let result: std::result::Result<serde_yaml::Value, _> =
            serde_yaml::from_str("invalid: yaml: content:");
        let error: EpiError = result.unwrap_err().into();
        assert!(matches!(error, EpiError::Serialization(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let error: EpiError = result.unwrap_err().into();
        assert!(matches!(error, EpiError::Serialization(_)));
    }
}
