//! Error types for the boundary checker.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a check from running. Rule violations are not errors;
/// they are reported in the `Report`.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid boundary configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid scan pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Failed to walk source tree: {0}")]
    Walk(#[from] ignore::Error),

    #[error("Failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}
