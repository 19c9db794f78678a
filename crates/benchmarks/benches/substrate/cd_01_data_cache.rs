//! # CD-01 Data Cache Benchmarks
//!
//! - store: content hashing + index insert, by payload size
//! - retrieve: hit path on a populated cache
//! - find_by_tags: tag index lookup over 10k entries
//! - eviction: LRU pressure with a full cache

use std::time::Duration;

use cd_01_data_cache::{
    CacheConfig, CacheKey, CachePayload, DataCache, DataCacheApi, EvictionPolicy, StoreOptions,
    Tags,
};
use conduit_benchmarks::utils::{runtime, text};
use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

fn cache(config: CacheConfig) -> DataCache {
    match DataCache::new(config) {
        Ok(cache) => cache,
        Err(e) => panic!("invalid benchmark cache config: {e}"),
    }
}

fn populate(rt: &Runtime, cache: &DataCache, count: u64) -> Vec<CacheKey> {
    rt.block_on(async {
        let mut keys = Vec::with_capacity(count as usize);
        for i in 0..count {
            let options = StoreOptions::new()
                .kind("text")
                .tag("speaker", format!("speaker-{}", i % 100));
            if let Ok(key) = cache.store(CachePayload::Text(text(i, 256)), options).await {
                keys.push(key);
            }
        }
        keys
    })
}

pub fn bench_store(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("cd-01/store");
    group.measurement_time(Duration::from_secs(5));

    for size in [64usize, 4 * 1024, 256 * 1024] {
        let payload = text(0, size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("text_bytes", size), &payload, |b, payload| {
            let cache = cache(CacheConfig::default());
            b.iter(|| {
                rt.block_on(async {
                    // Identical content replaces the entry, so the cache stays at one.
                    black_box(
                        cache
                            .store(CachePayload::Text(payload.clone()), StoreOptions::new())
                            .await
                            .is_ok(),
                    )
                })
            })
        });
    }

    group.finish();
}

pub fn bench_lookups(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("cd-01/lookup");

    let cache = cache(CacheConfig::default());
    let keys = populate(&rt, &cache, 10_000);

    group.bench_function("retrieve_hit", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let key = &keys[i % keys.len()];
            i += 1;
            rt.block_on(async { black_box(cache.retrieve(key).await.is_ok()) })
        })
    });

    group.bench_function("exists_miss", |b| {
        let missing = CacheKey::parse("cache://text/000000000000").ok();
        b.iter(|| {
            rt.block_on(async {
                match &missing {
                    Some(key) => black_box(cache.exists(key).await),
                    None => false,
                }
            })
        })
    });

    let tags: Tags = [("speaker".to_string(), "speaker-7".to_string())]
        .into_iter()
        .collect();
    group.bench_function("find_by_tags_1_of_100", |b| {
        b.iter(|| rt.block_on(async { black_box(cache.find_by_tags(&tags).await.len()) }))
    });

    group.finish();
}

pub fn bench_eviction(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("cd-01/eviction");

    for policy in [EvictionPolicy::LruOnly, EvictionPolicy::TtlOrLru] {
        let config = CacheConfig {
            max_entries: 1_000,
            eviction_policy: policy,
            ..CacheConfig::default()
        };
        let cache = cache(config);
        populate(&rt, &cache, 1_000);

        group.bench_function(format!("{policy:?}_full_cache_insert"), |b| {
            let mut i = 1_000u64;
            b.iter(|| {
                i += 1;
                rt.block_on(async {
                    black_box(
                        cache
                            .store(CachePayload::Text(text(i, 256)), StoreOptions::new())
                            .await
                            .is_ok(),
                    )
                })
            })
        });
    }

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    bench_store(c);
    bench_lookups(c);
    bench_eviction(c);
}
