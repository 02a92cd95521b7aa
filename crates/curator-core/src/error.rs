//! Error types for the curator reconciliation engine.
//!
//! Fatal conditions (missing library root, undeterminable model dialect)
//! surface as errors; per-file violations are collected into reports instead
//! and never abort a batch.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for curator operations.
#[derive(Debug, Error)]
pub enum CuratorError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: Option<serde_yaml::Error>,
    },

    // Configuration errors (missing root, failed repo discovery, bad flags)
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Structural validation errors on registry/metadata documents
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },
}

/// Result type alias for curator operations.
pub type Result<T> = std::result::Result<T, CuratorError>;

// Conversion implementations for common error types

impl From<std::io::Error> for CuratorError {
    fn from(err: std::io::Error) -> Self {
        CuratorError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for CuratorError {
    fn from(err: serde_json::Error) -> Self {
        CuratorError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_yaml::Error> for CuratorError {
    fn from(err: serde_yaml::Error) -> Self {
        CuratorError::Yaml {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl CuratorError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CuratorError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a configuration error from anything printable.
    pub fn config(message: impl Into<String>) -> Self {
        CuratorError::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CuratorError::Config {
            message: "library root does not exist: /nope".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Configuration error: library root does not exist: /nope"
        );
    }

    #[test]
    fn test_io_with_path_keeps_context() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = CuratorError::io_with_path(io, "/tmp/x.metadata.json");
        match err {
            CuratorError::Io { path, .. } => {
                assert_eq!(path.unwrap(), PathBuf::from("/tmp/x.metadata.json"))
            }
            _ => panic!("expected IO error"),
        }
    }
}
