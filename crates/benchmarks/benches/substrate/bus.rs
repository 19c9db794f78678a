//! # Event Bus Benchmarks
//!
//! - emit latency with 0..64 handlers on the topic
//! - wildcard subscribers on top of topic handlers
//! - an open tap on every emit

use std::sync::Arc;
use std::time::Duration;

use conduit_benchmarks::utils::runtime;
use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use shared_bus::{handler_fn, EventBus};

const TOPIC: &str = "ingestion.message.ready";

fn bus_with_handlers(count: usize) -> EventBus {
    let bus = EventBus::new();
    for i in 0..count {
        let handler = handler_fn(format!("bench.handler_{i}"), |event| async move {
            black_box(event.topic.len());
            Ok(())
        });
        let _ = bus.subscribe(TOPIC, handler);
    }
    bus
}

pub fn bench_emit(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("bus/emit");
    group.measurement_time(Duration::from_secs(5));

    for handlers in [0usize, 1, 8, 64] {
        let bus = bus_with_handlers(handlers);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("handlers", handlers), &bus, |b, bus| {
            b.iter(|| {
                rt.block_on(async {
                    let result = bus
                        .emit(TOPIC, json!({ "text": "hello" }), "bench")
                        .await;
                    black_box(result.map(|r| r.handler_count()))
                })
            })
        });
    }

    group.finish();
}

pub fn bench_wildcard_fanout(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("bus/wildcard");

    let bus = bus_with_handlers(8);
    for i in 0..8 {
        let _ = bus.subscribe(
            "*",
            handler_fn(format!("bench.audit_{i}"), |_event| async { Ok(()) }),
        );
    }
    group.bench_function("8_topic_8_wildcard", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(bus.emit(TOPIC, json!({ "text": "hello" }), "bench").await.is_ok())
            })
        })
    });

    let tapped = Arc::new(bus_with_handlers(8));
    let tap = tapped.tap("ingestion.*").ok();
    group.bench_function("8_topic_with_tap", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(tapped.emit(TOPIC, json!({ "text": "hello" }), "bench").await.is_ok())
            })
        })
    });
    drop(tap);

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    bench_emit(c);
    bench_wildcard_fanout(c);
}
