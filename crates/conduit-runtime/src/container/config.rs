//! # Runtime Configuration
//!
//! One TOML document holds the settings of every substrate component and of
//! the reference domains. Every section and field is optional.
//!
//! ```toml
//! [cache]
//! max_size_mb = 64
//! default_ttl = "10m"
//!
//! [stream]
//! notify_timeout = "2s"
//! subscriber_defaults = { queue_size = 32, policy = "drop_oldest" }
//!
//! [pipeline.stages.length_limit]
//! priority = 50
//! error_handling = "drop"
//!
//! [metrics]
//! report_interval = "15s"
//! ```
//!
//! ## Environment Overrides
//!
//! Applied after the file, before validation.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `CONDUIT_CONFIG` | Path of the TOML file |
//! | `CONDUIT_CACHE_MAX_SIZE_MB` | `cache.max_size_mb` |
//! | `CONDUIT_CACHE_MAX_ENTRIES` | `cache.max_entries` |
//! | `CONDUIT_CACHE_DEFAULT_TTL` | `cache.default_ttl` |
//! | `CONDUIT_STREAM_QUEUE_SIZE` | `stream.subscriber_defaults.queue_size` |
//! | `CONDUIT_STREAM_NOTIFY_TIMEOUT` | `stream.notify_timeout` |
//! | `CONDUIT_METRICS_INTERVAL` | `metrics.report_interval` |

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use cd_01_data_cache::{CacheConfig, CacheError};
use cd_02_stream_channel::{ChannelConfig, StreamError};
use cd_03_pipeline::{PipelineConfig, PipelineError};
use serde::{Deserialize, Serialize};
use shared_types::humantime_serde::parse_duration;
use thiserror::Error;

use crate::domains::decision::DecisionConfig;
use crate::domains::presentation::PresentationConfig;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "CONDUIT_CONFIG";

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Data cache configuration.
    pub cache: CacheConfig,
    /// Stream channel configuration.
    pub stream: ChannelConfig,
    /// Stage settings applied to the decision pipeline.
    pub pipeline: PipelineConfig,
    /// Reference decision domain.
    pub decision: DecisionConfig,
    /// Reference presentation domain.
    pub presentation: PresentationConfig,
    /// Metrics reporter.
    pub metrics: MetricsConfig,
}

/// Metrics reporter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// How often component counters are copied into Prometheus.
    #[serde(with = "shared_types::humantime_serde")]
    pub report_interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_secs(10),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidOverride { var: &'static str, value: String },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Invalid runtime configuration: {0}")]
    Invalid(String),
}

impl RuntimeConfig {
    /// Load from `CONDUIT_CONFIG` (defaults when unset), apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Same as [`RuntimeConfig::load`] over an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`].
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Does not validate.
    ///
    /// # Errors
    ///
    /// `ConfigError::Read` or `ConfigError::Parse`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidOverride` for an unparseable value.
    pub fn apply_overrides(
        &mut self,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = number(lookup, "CONDUIT_CACHE_MAX_SIZE_MB")? {
            self.cache.max_size_mb = v;
        }
        if let Some(v) = number(lookup, "CONDUIT_CACHE_MAX_ENTRIES")? {
            self.cache.max_entries = v;
        }
        if let Some(v) = duration(lookup, "CONDUIT_CACHE_DEFAULT_TTL")? {
            self.cache.default_ttl = v;
        }
        if let Some(v) = number(lookup, "CONDUIT_STREAM_QUEUE_SIZE")? {
            self.stream.subscriber_defaults.queue_size = v;
        }
        if let Some(v) = duration(lookup, "CONDUIT_STREAM_NOTIFY_TIMEOUT")? {
            self.stream.notify_timeout = v;
        }
        if let Some(v) = duration(lookup, "CONDUIT_METRICS_INTERVAL")? {
            self.metrics.report_interval = v;
        }
        Ok(())
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// The first invalid section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.stream.validate()?;
        self.pipeline.validate()?;
        self.decision.validate().map_err(ConfigError::Invalid)?;
        self.presentation.validate().map_err(ConfigError::Invalid)?;
        if self.metrics.report_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "metrics.report_interval cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

fn number<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride { var, value })
        })
        .transpose()
}

fn duration(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    lookup(var)
        .map(|value| parse_duration(&value).map_err(|_| ConfigError::InvalidOverride { var, value }))
        .transpose()
}
