//! # CD-03 Pipeline Benchmarks
//!
//! - process through 1..32 pass-through stages
//! - early drop: the first stage filters everything

use std::time::Duration;

use cd_03_pipeline::{stage_fn, PipelineManager, StageConfig, StageError};
use conduit_benchmarks::utils::{runtime, text};
use criterion::{black_box, BenchmarkId, Criterion, Throughput};

fn pipeline(stages: usize) -> PipelineManager<String> {
    let pipeline = PipelineManager::new();
    for i in 0..stages {
        let _ = pipeline.register(
            stage_fn(format!("stage_{i}"), |reply: String| async move {
                Ok::<_, StageError>(Some(reply))
            }),
            StageConfig::with_priority(i as i32),
        );
    }
    pipeline
}

pub fn bench_process(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("cd-03/process");
    group.measurement_time(Duration::from_secs(5));

    let reply = text(0, 256);
    for stages in [1usize, 8, 32] {
        let pipeline = pipeline(stages);
        group.throughput(Throughput::Elements(stages as u64));
        group.bench_with_input(BenchmarkId::new("stages", stages), &pipeline, |b, pipeline| {
            b.iter(|| {
                rt.block_on(async { black_box(pipeline.process(reply.clone()).await.is_ok()) })
            })
        });
    }

    group.finish();
}

pub fn bench_early_drop(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("cd-03/drop");

    let pipeline = pipeline(32);
    let _ = pipeline.register(
        stage_fn("filter_all", |_reply: String| async move { Ok::<_, StageError>(None) }),
        StageConfig::with_priority(-1),
    );
    let reply = text(0, 256);
    group.bench_function("first_of_33", |b| {
        b.iter(|| rt.block_on(async { black_box(pipeline.process(reply.clone()).await.is_ok()) }))
    });

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    bench_process(c);
    bench_early_drop(c);
}
