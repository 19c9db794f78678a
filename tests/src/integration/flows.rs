//! # Domain Flow Tests
//!
//! Drives the full runtime the way `conduit-runtime` does:
//!
//! ```text
//! [Ingestion] ──ingestion.message.ready──→ [Decision]
//!                                              │  pipeline, cache for long replies
//!                                              ↓
//!                                  decision.intent.generated
//!                                              │
//!                                              ↓
//!                                       [Presentation]
//!                         presentation.intent.ready / subtitle.show
//!                         speech stream ──→ PlaybackMonitor
//!                         presentation.output.rendered
//! ```
//!
//! ## Test Categories
//!
//! 1. **Happy Path**: a message becomes a rendered reply
//! 2. **Cache Handoff**: long replies travel as `cache://` references
//! 3. **Filtering**: empty messages and pipeline drops
//! 4. **Flow Enforcement**: domain bus rejects cross-domain misuse

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cd_01_data_cache::{CacheKey, CachePayload, DataCacheApi};
    use cd_03_pipeline::{stage_fn, StageConfig, StageError};
    use conduit_runtime::adapters::DomainBusError;
    use conduit_runtime::domains::ingestion::InboundMessage;
    use conduit_runtime::{ConduitRuntime, RuntimeConfig};
    use conduit_telemetry::BUS_FLOW_VIOLATIONS;
    use serde_json::json;
    use shared_bus::handler_fn;
    use shared_types::topics::{
        DECISION_INTENT_GENERATED, DECISION_MESSAGE_SKIPPED, INGESTION_MESSAGE_READY,
        PRESENTATION_OUTPUT_RENDERED,
    };
    use shared_types::{Domain, FlowViolation};

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    async fn started(config: RuntimeConfig) -> ConduitRuntime {
        let runtime = ConduitRuntime::new(config).expect("runtime should build");
        runtime.start().await.expect("runtime should start");
        runtime
    }

    fn topics(events: &[Arc<shared_types::Event>]) -> Vec<&str> {
        events.iter().map(|e| e.topic.as_str()).collect()
    }

    // =========================================================================
    // HAPPY PATH
    // =========================================================================

    #[tokio::test]
    async fn test_message_becomes_rendered_reply() {
        let runtime = started(RuntimeConfig::default()).await;
        let mut tap = runtime.container().bus.tap("*").unwrap();

        let published = runtime
            .ingestion()
            .submit(InboundMessage::new("chat", "viewer", "  hello   conduit "))
            .await
            .unwrap();
        assert!(published);

        // Taps see an event once its dispatch has finished, so nested
        // emissions arrive before the event that caused them.
        let events = tap.drain();
        assert_eq!(
            topics(&events),
            vec![
                "presentation.intent.ready",
                "presentation.subtitle.show",
                PRESENTATION_OUTPUT_RENDERED,
                DECISION_INTENT_GENERATED,
                INGESTION_MESSAGE_READY,
            ]
        );

        let intent = &events[3];
        assert_eq!(intent.source, "decision.responder");
        assert_eq!(intent.payload_str("reply_to"), Some("chat-0"));
        assert_eq!(intent.payload_str("text"), Some("viewer said: hello conduit"));

        let rendered = &events[2];
        assert_eq!(rendered.payload_str("device"), Some("speech"));
        assert_eq!(rendered.payload_str("stream_id"), Some("speech-0"));
        // 26 characters at 24 per chunk.
        assert_eq!(rendered.payload["chunks"], json!(2));

        let playback = runtime.playback();
        assert_eq!(playback.streams(), 1);
        assert_eq!(playback.chunks(), 2);
        assert!(playback.bytes() > 0);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_messages_render_in_order() {
        let runtime = started(RuntimeConfig::default()).await;
        let mut rendered = runtime.container().bus.tap(PRESENTATION_OUTPUT_RENDERED).unwrap();

        for text in ["one", "two", "three"] {
            runtime
                .ingestion()
                .submit(InboundMessage::new("chat", "viewer", text))
                .await
                .unwrap();
        }

        let replies: Vec<String> = rendered
            .drain()
            .iter()
            .filter_map(|e| e.payload_str("reply_to").map(str::to_string))
            .collect();
        assert_eq!(replies, vec!["chat-0", "chat-1", "chat-2"]);
        assert_eq!(runtime.playback().streams(), 3);
        assert_eq!(runtime.container().pipeline.stats().completed, 3);

        runtime.shutdown().await;
    }

    // =========================================================================
    // CACHE HANDOFF
    // =========================================================================

    #[tokio::test]
    async fn test_long_reply_travels_by_reference() {
        let mut config = RuntimeConfig::default();
        config.decision.inline_text_limit = 16;
        let runtime = started(config).await;
        let mut intents = runtime.container().bus.tap(DECISION_INTENT_GENERATED).unwrap();

        runtime
            .ingestion()
            .submit(InboundMessage::new("chat", "viewer", "this reply is long enough"))
            .await
            .unwrap();

        let intent = intents.try_recv().unwrap().expect("intent should be emitted");
        assert_eq!(intent.payload_str("text"), None);
        let reference = intent.payload_str("ref").expect("long reply carries a ref");
        assert!(reference.starts_with("cache://text/"));

        let container = runtime.container();
        let cache = &container.cache;
        let key = CacheKey::parse(reference).unwrap();
        match cache.retrieve(&key).await.unwrap() {
            CachePayload::Text(text) => assert_eq!(text, "viewer said: this reply is long enough"),
            other => panic!("expected text payload, got {other:?}"),
        }
        assert_eq!(cache.get_stats().entry_count, 1);

        // Presentation resolved the same text.
        assert_eq!(runtime.playback().streams(), 1);

        runtime.shutdown().await;
    }

    // =========================================================================
    // FILTERING
    // =========================================================================

    #[tokio::test]
    async fn test_empty_message_is_ignored() {
        let runtime = started(RuntimeConfig::default()).await;
        let mut tap = runtime.container().bus.tap("*").unwrap();

        let published = runtime
            .ingestion()
            .submit(InboundMessage::new("chat", "viewer", "   \n\t "))
            .await
            .unwrap();

        assert!(!published);
        assert!(tap.drain().is_empty());
        assert_eq!(runtime.ingestion().received(), 1);
        assert_eq!(runtime.ingestion().published(), 0);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_pipeline_drop_is_reported_as_skip() {
        let runtime = started(RuntimeConfig::default()).await;
        runtime
            .container()
            .pipeline
            .register(
                stage_fn("moderation", |reply: String| async move {
                    if reply.contains("spoiler") {
                        Ok::<_, StageError>(None)
                    } else {
                        Ok(Some(reply))
                    }
                }),
                StageConfig::with_priority(20),
            )
            .unwrap();
        let mut tap = runtime.container().bus.tap("decision.*").unwrap();

        runtime
            .ingestion()
            .submit(InboundMessage::new("chat", "viewer", "big spoiler ahead"))
            .await
            .unwrap();

        let events = tap.drain();
        assert_eq!(topics(&events), vec![DECISION_MESSAGE_SKIPPED]);
        assert_eq!(events[0].payload_str("message_id"), Some("chat-0"));
        assert_eq!(events[0].payload_str("reason"), Some("dropped by pipeline"));
        assert_eq!(runtime.playback().streams(), 0);

        let stats = runtime.container().pipeline.stats();
        assert_eq!(stats.runs, 1);
        assert_eq!(stats.dropped, 1);

        runtime.shutdown().await;
    }

    // =========================================================================
    // FLOW ENFORCEMENT
    // =========================================================================

    #[tokio::test]
    async fn test_domain_bus_rejects_cross_domain_use() {
        let runtime = started(RuntimeConfig::default()).await;
        let container = runtime.container();
        let before = BUS_FLOW_VIOLATIONS
            .with_label_values(&["ingestion", "upstream_consumption"])
            .get();

        let ingestion = container.domain_bus(Domain::Ingestion);
        let err = ingestion
            .emit(DECISION_INTENT_GENERATED, json!({ "text": "forged" }), "chat")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainBusError::Flow(FlowViolation::ForeignPublish { .. })
        ));

        let err = ingestion
            .subscribe(
                PRESENTATION_OUTPUT_RENDERED,
                handler_fn("ingestion.echo", |_event| async { Ok(()) }),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            DomainBusError::Flow(FlowViolation::UpstreamConsumption { .. })
        ));

        let after = BUS_FLOW_VIOLATIONS
            .with_label_values(&["ingestion", "upstream_consumption"])
            .get();
        assert!(after > before);

        // Nothing leaked onto the bus: only the domains' own handlers remain.
        assert_eq!(container.bus.subscriber_count(), 2);
        assert_eq!(runtime.playback().streams(), 0);

        // Downstream domains may still consume upstream topics.
        let presentation = container.domain_bus(Domain::Presentation);
        let id = presentation
            .subscribe(
                INGESTION_MESSAGE_READY,
                handler_fn("presentation.chat_overlay", |_event| async { Ok(()) }),
            )
            .unwrap();
        assert!(presentation.unsubscribe(&id));

        runtime.shutdown().await;
    }
}
