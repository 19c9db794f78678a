//! Stage configuration: the only contract a stage implementation must honor.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::PipelineError;

/// Priority given to stages configured without one.
pub const DEFAULT_STAGE_PRIORITY: i32 = 100;

/// Default per-stage timeout, in seconds.
pub const DEFAULT_STAGE_TIMEOUT_SECS: f64 = 5.0;

/// What to do when a stage fails or times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorHandling {
    /// Log and pass the pre-stage artifact to the next stage.
    #[default]
    #[serde(alias = "CONTINUE")]
    Continue,
    /// Abort the whole `process()` call with `PipelineError::StageFailed`.
    #[serde(alias = "STOP")]
    Stop,
    /// Discard the artifact: `process()` returns `None`.
    #[serde(alias = "DROP")]
    Drop,
}

/// Per-stage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Lower runs first. Ties run in registration order.
    pub priority: i32,
    pub enabled: bool,
    pub error_handling: ErrorHandling,
    pub timeout_seconds: f64,
    /// Stage-specific settings, passed through untouched.
    pub options: BTreeMap<String, serde_json::Value>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            priority: DEFAULT_STAGE_PRIORITY,
            enabled: true,
            error_handling: ErrorHandling::Continue,
            timeout_seconds: DEFAULT_STAGE_TIMEOUT_SECS,
            options: BTreeMap::new(),
        }
    }
}

impl StageConfig {
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn error_handling(mut self, handling: ErrorHandling) -> Self {
        self.error_handling = handling;
        self
    }

    #[must_use]
    pub fn timeout_seconds(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// The timeout as a `Duration`. A value `validate` would reject maps to
    /// `Duration::MAX`.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds).unwrap_or(Duration::MAX)
    }

    /// # Errors
    ///
    /// `PipelineError::InvalidConfig` unless the timeout is a positive
    /// number of seconds that fits in a `Duration`.
    pub fn validate(&self, stage: &str) -> Result<(), PipelineError> {
        if self.timeout_seconds <= 0.0 || Duration::try_from_secs_f64(self.timeout_seconds).is_err() {
            return Err(PipelineError::InvalidConfig {
                stage: stage.to_string(),
                reason: format!(
                    "timeout_seconds must be positive, got {}",
                    self.timeout_seconds
                ),
            });
        }
        Ok(())
    }
}

/// Stage settings by stage name, as loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub stages: BTreeMap<String, StageConfig>,
}

impl PipelineConfig {
    /// # Errors
    ///
    /// The first stage whose settings are invalid.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.stages
            .iter()
            .try_for_each(|(name, config)| config.validate(name))
    }

    pub fn get(&self, stage: &str) -> Option<&StageConfig> {
        self.stages.get(stage)
    }
}
