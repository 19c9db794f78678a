//! Prometheus metrics for the Conduit substrate.
//!
//! All metrics follow the naming convention: `conduit_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., bus_events_emitted_total)
//! - **Gauge**: Value that can go up or down (e.g., cache_size_bytes)
//! - **Histogram**: Distribution of values (e.g., pipeline_process_duration_seconds)
//!
//! Components keep their own counters; the runtime's metrics reporter copies
//! them here periodically. Counters fed that way are advanced with
//! [`sync_counter`], which only ever adds the difference.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // EVENT BUS METRICS
    // =========================================================================

    pub static ref BUS_EVENTS_EMITTED: IntCounter = IntCounter::new(
        "conduit_bus_events_emitted_total",
        "Events dispatched by the event bus"
    ).expect("metric creation failed");

    pub static ref BUS_HANDLER_FAILURES: IntCounter = IntCounter::new(
        "conduit_bus_handler_failures_total",
        "Handler invocations that returned an error or panicked"
    ).expect("metric creation failed");

    pub static ref BUS_SUBSCRIPTIONS: IntGauge = IntGauge::new(
        "conduit_bus_subscriptions",
        "Active event bus subscriptions"
    ).expect("metric creation failed");

    /// Publishes or subscriptions rejected by a domain bus adapter
    pub static ref BUS_FLOW_VIOLATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("conduit_bus_flow_violations_total", "Rejected cross-domain bus operations"),
        &["domain", "kind"]  // kind: foreign_publish/upstream_consumption/wildcard/direct_dependency
    ).expect("metric creation failed");

    // =========================================================================
    // DATA CACHE METRICS
    // =========================================================================

    pub static ref CACHE_HITS: IntCounter = IntCounter::new(
        "conduit_cache_hits_total",
        "Successful cache retrievals"
    ).expect("metric creation failed");

    pub static ref CACHE_MISSES: IntCounter = IntCounter::new(
        "conduit_cache_misses_total",
        "Cache retrievals for absent or expired keys"
    ).expect("metric creation failed");

    pub static ref CACHE_EVICTIONS: IntCounter = IntCounter::new(
        "conduit_cache_evictions_total",
        "Entries evicted to make room"
    ).expect("metric creation failed");

    pub static ref CACHE_EXPIRATIONS: IntCounter = IntCounter::new(
        "conduit_cache_expirations_total",
        "Entries removed after their TTL elapsed"
    ).expect("metric creation failed");

    pub static ref CACHE_SIZE_BYTES: IntGauge = IntGauge::new(
        "conduit_cache_size_bytes",
        "Bytes currently held by the cache"
    ).expect("metric creation failed");

    pub static ref CACHE_ENTRIES: IntGauge = IntGauge::new(
        "conduit_cache_entries",
        "Entries currently held by the cache"
    ).expect("metric creation failed");

    // =========================================================================
    // STREAM CHANNEL METRICS
    // =========================================================================

    pub static ref STREAM_CHUNKS_PUBLISHED: IntCounter = IntCounter::new(
        "conduit_stream_chunks_published_total",
        "Chunks published to the stream channel"
    ).expect("metric creation failed");

    pub static ref STREAM_CHUNKS_DROPPED: IntCounter = IntCounter::new(
        "conduit_stream_chunks_dropped_total",
        "Chunks displaced by drop-newest or drop-oldest subscribers"
    ).expect("metric creation failed");

    pub static ref STREAM_SUBSCRIBERS: IntGauge = IntGauge::new(
        "conduit_stream_subscribers",
        "Active stream subscriptions"
    ).expect("metric creation failed");

    // =========================================================================
    // PIPELINE METRICS
    // =========================================================================

    pub static ref PIPELINE_RUNS: IntCounterVec = IntCounterVec::new(
        Opts::new("conduit_pipeline_runs_total", "Pipeline process() calls by outcome"),
        &["outcome"]  // outcome: completed/dropped/aborted
    ).expect("metric creation failed");

    pub static ref PIPELINE_STAGE_OUTCOMES: IntCounterVec = IntCounterVec::new(
        Opts::new("conduit_pipeline_stage_outcomes_total", "Stage invocations by outcome"),
        &["stage", "outcome"]  // outcome: processed/dropped/error/timeout
    ).expect("metric creation failed");

    pub static ref PIPELINE_STAGE_AVG_SECONDS: GaugeVec = GaugeVec::new(
        Opts::new("conduit_pipeline_stage_avg_duration_seconds", "Average stage duration"),
        &["stage"]
    ).expect("metric creation failed");

    pub static ref PIPELINE_PROCESS_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "conduit_pipeline_process_duration_seconds",
            "Time spent in one pipeline process() call"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).unwrap_or_default())
    ).expect("metric creation failed");
}

/// Handle proving the metrics are registered.
#[derive(Debug, Clone, Copy)]
pub struct MetricsHandle {
    _private: (),
}

/// Register all metrics with the global registry. Safe to call repeatedly.
///
/// # Errors
///
/// `TelemetryError::MetricsInit` if a metric cannot be registered for any
/// reason other than already being registered.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Event bus
        Box::new(BUS_EVENTS_EMITTED.clone()),
        Box::new(BUS_HANDLER_FAILURES.clone()),
        Box::new(BUS_SUBSCRIPTIONS.clone()),
        Box::new(BUS_FLOW_VIOLATIONS.clone()),
        // Cache
        Box::new(CACHE_HITS.clone()),
        Box::new(CACHE_MISSES.clone()),
        Box::new(CACHE_EVICTIONS.clone()),
        Box::new(CACHE_EXPIRATIONS.clone()),
        Box::new(CACHE_SIZE_BYTES.clone()),
        Box::new(CACHE_ENTRIES.clone()),
        // Stream
        Box::new(STREAM_CHUNKS_PUBLISHED.clone()),
        Box::new(STREAM_CHUNKS_DROPPED.clone()),
        Box::new(STREAM_SUBSCRIBERS.clone()),
        // Pipeline
        Box::new(PIPELINE_RUNS.clone()),
        Box::new(PIPELINE_STAGE_OUTCOMES.clone()),
        Box::new(PIPELINE_STAGE_AVG_SECONDS.clone()),
        Box::new(PIPELINE_PROCESS_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle { _private: () })
}

/// Advance `counter` to `total`. Never moves it backwards.
pub fn sync_counter(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

/// Encode all metrics as Prometheus text format.
///
/// # Errors
///
/// `TelemetryError::MetricsInit` if encoding fails.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
