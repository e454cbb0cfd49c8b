//! Structured log record types for job output and image pulls.

use serde::{Deserialize, Serialize};

/// Output stream of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// A single job log line (Docker-compatible JSON format).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The captured text, including any trailing newline.
    pub log: String,
    pub stream: LogStream,
    /// RFC 3339 timestamp with nanosecond precision.
    pub time: String,
}

impl LogEntry {
    /// Build an entry stamped with the current time.
    pub fn now(stream: LogStream, bytes: &[u8]) -> Self {
        Self {
            log: String::from_utf8_lossy(bytes).into_owned(),
            stream,
            time: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
        }
    }
}

/// One record of an image pull progress stream.
///
/// Mirrors the JSON objects the Docker engine emits while pulling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullProgress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PullProgress {
    /// Parse one newline-delimited progress line.
    pub fn parse(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }
}
