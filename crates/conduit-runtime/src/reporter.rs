//! # Metrics Reporter
//!
//! Components keep their own counters. This task copies them into the
//! Prometheus collectors of `conduit-telemetry` on a fixed interval, and
//! once more at shutdown.

use std::sync::Arc;
use std::time::Duration;

use cd_01_data_cache::DataCacheApi;
use conduit_telemetry::{
    sync_counter, BUS_EVENTS_EMITTED, BUS_HANDLER_FAILURES, BUS_SUBSCRIPTIONS, CACHE_ENTRIES,
    CACHE_EVICTIONS, CACHE_EXPIRATIONS, CACHE_HITS, CACHE_MISSES, CACHE_SIZE_BYTES,
    PIPELINE_RUNS, PIPELINE_STAGE_AVG_SECONDS, PIPELINE_STAGE_OUTCOMES, STREAM_CHUNKS_DROPPED,
    STREAM_CHUNKS_PUBLISHED, STREAM_SUBSCRIBERS,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::container::SubstrateContainer;

/// Copy every component's counters into the Prometheus collectors.
pub fn report_once(container: &SubstrateContainer) {
    let bus = container.bus.stats();
    sync_counter(&BUS_EVENTS_EMITTED, bus.events_emitted);
    sync_counter(&BUS_HANDLER_FAILURES, bus.handler_failures);
    BUS_SUBSCRIPTIONS.set(bus.subscriptions as i64);

    let cache = container.cache.get_stats();
    sync_counter(&CACHE_HITS, cache.hits);
    sync_counter(&CACHE_MISSES, cache.misses);
    sync_counter(&CACHE_EVICTIONS, cache.evictions);
    sync_counter(&CACHE_EXPIRATIONS, cache.expirations);
    CACHE_SIZE_BYTES.set(cache.current_size_bytes as i64);
    CACHE_ENTRIES.set(cache.entry_count as i64);

    let stream = container.stream.stats();
    sync_counter(&STREAM_CHUNKS_PUBLISHED, stream.chunks_published);
    STREAM_SUBSCRIBERS.set(stream.subscribers as i64);
    // Per-subscriber counters vanish with the subscriber; the Prometheus
    // counter keeps what it has already seen.
    let dropped: u64 = container
        .stream
        .subscriber_stats()
        .iter()
        .map(|s| s.dropped)
        .sum();
    sync_counter(&STREAM_CHUNKS_DROPPED, dropped);

    let pipeline = container.pipeline.stats();
    sync_counter(&PIPELINE_RUNS.with_label_values(&["completed"]), pipeline.completed);
    sync_counter(&PIPELINE_RUNS.with_label_values(&["dropped"]), pipeline.dropped);
    sync_counter(&PIPELINE_RUNS.with_label_values(&["aborted"]), pipeline.aborted);

    for (stage, stats) in container.pipeline.all_stage_stats() {
        for (outcome, total) in [
            ("processed", stats.processed),
            ("dropped", stats.dropped),
            ("error", stats.errors),
            ("timeout", stats.timeouts),
        ] {
            sync_counter(
                &PIPELINE_STAGE_OUTCOMES.with_label_values(&[stage.as_str(), outcome]),
                total,
            );
        }
        PIPELINE_STAGE_AVG_SECONDS
            .with_label_values(&[stage.as_str()])
            .set(stats.average_duration().as_secs_f64());
    }

    debug!(
        events = bus.events_emitted,
        cache_entries = cache.entry_count,
        chunks = stream.chunks_published,
        pipeline_runs = pipeline.runs,
        "Metrics reported"
    );
}

/// Spawn the reporter. It exits when `shutdown_rx` flips to `true` or its
/// sender is dropped.
pub fn spawn_reporter(
    container: Arc<SubstrateContainer>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    info!(interval_ms = period.as_millis() as u64, "Metrics reporter started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => report_once(&container),
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        report_once(&container);
        debug!("Metrics reporter stopped");
    })
}
