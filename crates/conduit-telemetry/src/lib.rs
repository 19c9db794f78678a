//! # Conduit Telemetry
//!
//! Logging and metrics shared by every Conduit crate.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with an `EnvFilter` and a pretty or
//!   JSON formatter, plus `log_event!`-style macros for consistent fields
//! - **Metrics**: Prometheus collectors for the bus, cache, stream channel
//!   and pipeline, rendered with [`gather_metrics`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conduit_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Log lines and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CONDUIT_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directive |
//! | `CONDUIT_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `CONDUIT_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `CONDUIT_SERVICE_NAME` | `conduit` | Service name in the startup line |

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    gather_metrics, register_metrics, sync_counter, HistogramTimer, MetricsHandle,
    BUS_EVENTS_EMITTED, BUS_FLOW_VIOLATIONS, BUS_HANDLER_FAILURES, BUS_SUBSCRIPTIONS,
    CACHE_ENTRIES, CACHE_EVICTIONS, CACHE_EXPIRATIONS, CACHE_HITS, CACHE_MISSES,
    CACHE_SIZE_BYTES, PIPELINE_PROCESS_DURATION, PIPELINE_RUNS, PIPELINE_STAGE_AVG_SECONDS,
    PIPELINE_STAGE_OUTCOMES, STREAM_CHUNKS_DROPPED, STREAM_CHUNKS_PUBLISHED, STREAM_SUBSCRIBERS,
};
pub use tracing_setup::env_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and register metrics.
///
/// Returns a guard to hold for the lifetime of the application.
///
/// # Errors
///
/// Fails if the log filter is invalid, a global subscriber is already
/// installed, or metric registration fails.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first (no dependency on logging)
    let metrics = register_metrics()?;
    tracing_setup::init_tracing(&config)?;

    Ok(TelemetryGuard {
        service_name: config.service_name,
        _metrics: metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
