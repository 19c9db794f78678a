//! # CD-02 Stream Channel Benchmarks
//!
//! - publish fan-out to 1..32 drop-oldest subscribers
//! - publish with one stalled subscriber (queue permanently full)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cd_02_stream_channel::{
    AudioChunk, BackpressurePolicy, CallbackError, ChannelConfig, StreamChannel,
    StreamSubscriber, SubscriberConfig,
};
use conduit_benchmarks::utils::runtime;
use criterion::{black_box, BenchmarkId, Criterion, Throughput};

/// 20 ms of 16 kHz mono PCM.
const CHUNK_BYTES: usize = 640;

struct Sink;

#[async_trait]
impl StreamSubscriber<AudioChunk> for Sink {
    async fn on_chunk(&self, chunk: Arc<AudioChunk>) -> Result<(), CallbackError> {
        black_box(chunk.data.len());
        Ok(())
    }
}

/// Never returns from its first chunk.
struct Stalled;

#[async_trait]
impl StreamSubscriber<AudioChunk> for Stalled {
    async fn on_chunk(&self, _chunk: Arc<AudioChunk>) -> Result<(), CallbackError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

fn channel() -> StreamChannel<AudioChunk> {
    match StreamChannel::new(ChannelConfig::default()) {
        Ok(channel) => {
            channel.start();
            channel
        }
        Err(e) => panic!("invalid benchmark channel config: {e}"),
    }
}

pub fn bench_fanout(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("cd-02/publish");
    group.measurement_time(Duration::from_secs(5));

    for subscribers in [1usize, 4, 32] {
        let channel = rt.block_on(async {
            let channel = channel();
            for i in 0..subscribers {
                let _ = channel.subscribe(
                    &format!("sink-{i}"),
                    Arc::new(Sink),
                    SubscriberConfig::new(256, BackpressurePolicy::DropOldest),
                );
            }
            channel
        });

        group.throughput(Throughput::Bytes((CHUNK_BYTES * subscribers) as u64));
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &channel,
            |b, channel| {
                let mut sequence = 0u64;
                b.iter(|| {
                    let chunk = AudioChunk::new(vec![0; CHUNK_BYTES], 16_000, 1, sequence);
                    sequence += 1;
                    rt.block_on(async { black_box(channel.publish(chunk).await.is_ok()) })
                })
            },
        );

        rt.block_on(channel.stop());
    }

    group.finish();
}

pub fn bench_stalled_subscriber(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("cd-02/backpressure");

    for policy in [BackpressurePolicy::DropOldest, BackpressurePolicy::DropNewest] {
        let channel = rt.block_on(async {
            let channel = channel();
            let _ = channel.subscribe_default("speaker", Arc::new(Sink));
            let _ = channel.subscribe("avatar", Arc::new(Stalled), SubscriberConfig::new(8, policy));
            channel
        });

        group.bench_function(format!("{policy:?}_stalled"), |b| {
            let mut sequence = 0u64;
            b.iter(|| {
                let chunk = AudioChunk::new(vec![0; CHUNK_BYTES], 16_000, 1, sequence);
                sequence += 1;
                rt.block_on(async { black_box(channel.publish(chunk).await.map(|r| r.drop_count())) })
            })
        });

        rt.block_on(channel.stop());
    }

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    bench_fanout(c);
    bench_stalled_subscriber(c);
}
