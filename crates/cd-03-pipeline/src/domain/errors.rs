//! Error types for the pipeline

use std::time::Duration;

use thiserror::Error;

/// Why a single stage invocation failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageError {
    /// Returned by the stage itself.
    #[error("{0}")]
    Failed(String),

    /// The stage did not finish in time and was cancelled.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("panicked: {0}")]
    Panicked(String),
}

impl StageError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Errors returned to pipeline callers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// A `Stop` stage failed; the `process()` call was aborted.
    #[error("Stage '{stage}' failed: {message}")]
    StageFailed {
        stage: String,
        message: String,
        #[source]
        cause: StageError,
    },

    #[error("Stage '{0}' is already registered")]
    DuplicateStage(String),

    #[error("No stage named '{0}'")]
    UnknownStage(String),

    #[error("Invalid configuration for stage '{stage}': {reason}")]
    InvalidConfig { stage: String, reason: String },
}
