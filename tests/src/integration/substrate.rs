//! # Substrate Tests
//!
//! The four substrate components wired by hand, without the runtime:
//!
//! 1. **Bus → Pipeline → Cache**: a handler post-processes events and
//!    stores the result, later found again by tag
//! 2. **Stream isolation**: a failing or slow subscriber never costs the
//!    others a chunk

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    use cd_01_data_cache::{
        CacheConfig, CachePayload, DataCache, DataCacheApi, StoreOptions, Tags,
    };
    use cd_02_stream_channel::{
        AudioChunk, BackpressurePolicy, CallbackError, ChannelConfig, StreamChannel,
        StreamMetadata, StreamSubscriber, SubscriberConfig,
    };
    use cd_03_pipeline::{stage_fn, ErrorHandling, PipelineManager, StageConfig, StageError};
    use shared_bus::{handler_fn, EventBus, HandlerError};

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    /// Records every chunk sequence it sees; fails the ones listed.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u64>>,
        fail_on: Vec<u64>,
        gate: Option<Arc<tokio::sync::Semaphore>>,
    }

    #[async_trait]
    impl StreamSubscriber<AudioChunk> for Recorder {
        async fn on_chunk(&self, chunk: Arc<AudioChunk>) -> Result<(), CallbackError> {
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.map_err(|e| CallbackError::new(e.to_string()))?;
            }
            self.seen.lock().push(chunk.sequence);
            if self.fail_on.contains(&chunk.sequence) {
                return Err(CallbackError::new(format!("cannot play {}", chunk.sequence)));
            }
            Ok(())
        }
    }

    fn chunk(sequence: u64) -> AudioChunk {
        AudioChunk::new(vec![0; 320], 16_000, 1, sequence)
    }

    fn started_channel() -> StreamChannel<AudioChunk> {
        let channel = StreamChannel::new(ChannelConfig::default()).unwrap();
        channel.start();
        channel
    }

    // =========================================================================
    // BUS → PIPELINE → CACHE
    // =========================================================================

    #[tokio::test]
    async fn test_bus_pipeline_cache_chain() {
        let bus = Arc::new(EventBus::new());
        let cache = Arc::new(DataCache::new(CacheConfig::default()).unwrap());
        let pipeline = Arc::new(PipelineManager::<String>::new());

        pipeline
            .register(
                stage_fn("uppercase", |text: String| async move {
                    Ok::<_, StageError>(Some(text.to_uppercase()))
                }),
                StageConfig::with_priority(10),
            )
            .unwrap();
        pipeline
            .register(
                stage_fn("reject_empty", |text: String| async move {
                    if text.trim().is_empty() {
                        return Err(StageError::failed("empty transcript"));
                    }
                    Ok(Some(text))
                }),
                StageConfig::with_priority(20).error_handling(ErrorHandling::Drop),
            )
            .unwrap();

        let handler = {
            let cache = Arc::clone(&cache);
            let pipeline = Arc::clone(&pipeline);
            handler_fn("transcript.archiver", move |event| {
                let cache = Arc::clone(&cache);
                let pipeline = Arc::clone(&pipeline);
                async move {
                    let text = event.payload_str("text").unwrap_or_default().to_string();
                    let speaker = event.payload_str("speaker").unwrap_or("unknown").to_string();
                    let Some(processed) = pipeline
                        .process(text)
                        .await
                        .map_err(|e| HandlerError::failed(e.to_string()))?
                    else {
                        return Ok(());
                    };
                    cache
                        .store(
                            CachePayload::Text(processed),
                            StoreOptions::new().kind("text").tag("speaker", speaker),
                        )
                        .await
                        .map_err(|e| HandlerError::failed(e.to_string()))?;
                    Ok(())
                }
            })
        };
        bus.subscribe("ingestion.transcript.final", handler).unwrap();

        for (speaker, text) in [("host", "welcome back"), ("guest", "   "), ("host", "thanks")] {
            let result = bus
                .emit(
                    "ingestion.transcript.final",
                    json!({ "speaker": speaker, "text": text }),
                    "ingestion.speech",
                )
                .await
                .unwrap();
            assert!(result.all_succeeded());
        }

        let host: Tags = [("speaker".to_string(), "host".to_string())].into_iter().collect();
        let keys = cache.find_by_tags(&host).await;
        assert_eq!(keys.len(), 2);
        let mut texts = Vec::new();
        for key in &keys {
            match cache.retrieve(key).await.unwrap() {
                CachePayload::Text(text) => texts.push(text),
                other => panic!("expected text, got {other:?}"),
            }
        }
        texts.sort();
        assert_eq!(texts, vec!["THANKS", "WELCOME BACK"]);

        let guest: Tags = [("speaker".to_string(), "guest".to_string())].into_iter().collect();
        assert!(cache.find_by_tags(&guest).await.is_empty());

        let stats = pipeline.stats();
        assert_eq!(stats.runs, 3);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(bus.stats().handler_failures, 0);
    }

    // =========================================================================
    // STREAM ISOLATION
    // =========================================================================

    #[tokio::test]
    async fn test_failing_subscriber_is_isolated() {
        let channel = started_channel();
        let healthy = Arc::new(Recorder::default());
        let failing = Arc::new(Recorder {
            fail_on: vec![0],
            ..Recorder::default()
        });
        channel.subscribe_default("speaker", healthy.clone()).unwrap();
        let failing_id = channel.subscribe_default("avatar", failing.clone()).unwrap();

        let metadata = StreamMetadata::new("speech-0", "pcm_s16le").with_audio(16_000, 1);
        assert!(channel.notify_start(metadata.clone()).await.all_succeeded());
        for sequence in 0..3 {
            channel.publish(chunk(sequence)).await.unwrap();
        }
        // The end marker is handled after every queued chunk.
        let ended = channel.notify_end(metadata.clone()).await;
        assert_eq!(ended.notified, 2);

        assert_eq!(*healthy.seen.lock(), vec![0, 1, 2]);
        assert_eq!(*failing.seen.lock(), vec![0, 1, 2]);

        // The callback failure surfaces on the next publish.
        channel.notify_start(metadata).await;
        let result = channel.publish(chunk(0)).await.unwrap();
        assert_eq!(result.delivered, 2);
        assert_eq!(result.consumer_faults.len(), 1);
        assert!(result.consumer_faults[&failing_id].contains("cannot play 0"));

        channel.stop().await;
    }

    #[tokio::test]
    async fn test_slow_subscriber_drops_only_its_own_chunks() {
        let channel = started_channel();
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let fast = Arc::new(Recorder::default());
        let slow = Arc::new(Recorder {
            gate: Some(Arc::clone(&gate)),
            ..Recorder::default()
        });
        let fast_id = channel.subscribe_default("fast", fast.clone()).unwrap();
        let slow_id = channel
            .subscribe(
                "slow",
                slow.clone(),
                SubscriberConfig::new(2, BackpressurePolicy::DropOldest),
            )
            .unwrap();

        let mut dropped = 0;
        for sequence in 0..6 {
            let result = channel.publish(chunk(sequence)).await.unwrap();
            assert!(result.errors.is_empty());
            dropped += result.drop_count();
        }
        // Two queued plus at most one held by the blocked callback.
        assert!(dropped >= 3, "dropped {dropped}");

        let slow_stats = channel
            .subscriber_stats()
            .into_iter()
            .find(|s| s.id == slow_id)
            .unwrap();
        assert_eq!(slow_stats.dropped, dropped as u64);
        let fast_stats = channel
            .subscriber_stats()
            .into_iter()
            .find(|s| s.id == fast_id)
            .unwrap();
        assert_eq!(fast_stats.dropped, 0);

        // Release the slow consumer: it ends with the newest chunks.
        gate.add_permits(16);
        let metadata = StreamMetadata::new("speech-0", "pcm_s16le");
        tokio::time::timeout(Duration::from_secs(5), channel.notify_end(metadata))
            .await
            .unwrap();

        assert_eq!(*fast.seen.lock(), vec![0, 1, 2, 3, 4, 5]);
        let slow_seen = slow.seen.lock().clone();
        assert_eq!(slow_seen.len(), 6 - dropped);
        assert_eq!(&slow_seen[slow_seen.len() - 2..], &[4, 5]);

        channel.stop().await;
    }
}
