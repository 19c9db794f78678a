//! # Decision Domain
//!
//! Turns `ingestion.message.ready` into `decision.intent.generated`.
//!
//! ```text
//! ingestion.message.ready
//!         │
//!         ↓
//!   compose reply ──→ pipeline (normalize → length_limit → ...)
//!                          │
//!          ┌───────────────┼─────────────────────┐
//!          ↓               ↓                     ↓
//!     short reply      long reply            dropped / aborted
//!     inline text      cache://text/<hex>    decision.message.skipped
//!          └───────┬───────┘
//!                  ↓
//!      decision.intent.generated
//! ```
//!
//! The responder itself is a stand-in for an LLM client: it echoes the
//! message back to its author. Replies longer than `inline_text_limit`
//! travel as a cache reference instead of inline text.

use std::sync::Arc;
use std::time::Duration;

use cd_01_data_cache::{CachePayload, DataCache, DataCacheApi, StoreOptions};
use cd_03_pipeline::{
    stage_fn, ErrorHandling, PipelineConfig, PipelineError, PipelineManager, StageConfig,
    StageError,
};
use conduit_telemetry::{log_event, log_topic_event, time_histogram, PIPELINE_PROCESS_DURATION};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_bus::{handler_fn, HandlerError};
use shared_types::topics::{
    DECISION_INTENT_GENERATED, DECISION_MESSAGE_SKIPPED, INGESTION_MESSAGE_READY,
};
use shared_types::{Event, SubscriptionId};

use crate::adapters::{DomainBus, DomainBusError};

const COMPONENT: &str = "decision";

/// Collapses whitespace in the reply.
pub const STAGE_NORMALIZE: &str = "normalize";
/// Truncates long replies, drops empty ones.
pub const STAGE_LENGTH_LIMIT: &str = "length_limit";

/// Decision domain configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Replies longer than this many bytes are stored in the cache.
    pub inline_text_limit: usize,
    /// TTL of cached replies.
    #[serde(with = "shared_types::humantime_serde")]
    pub reply_ttl: Duration,
    /// Replies are truncated to this many characters.
    pub max_reply_chars: usize,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            inline_text_limit: 256,
            reply_ttl: Duration::from_secs(300),
            max_reply_chars: 2000,
        }
    }
}

impl DecisionConfig {
    /// # Errors
    ///
    /// A description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.reply_ttl.is_zero() {
            return Err("decision.reply_ttl cannot be 0".into());
        }
        if self.max_reply_chars == 0 {
            return Err("decision.max_reply_chars cannot be 0".into());
        }
        Ok(())
    }
}

/// Reference responder.
pub fn compose_reply(author: &str, text: &str) -> String {
    format!("{author} said: {text}")
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

pub struct DecisionDomain {
    bus: DomainBus,
    pipeline: Arc<PipelineManager<String>>,
    cache: Arc<DataCache>,
    config: DecisionConfig,
}

impl DecisionDomain {
    pub fn new(
        bus: DomainBus,
        pipeline: Arc<PipelineManager<String>>,
        cache: Arc<DataCache>,
        config: DecisionConfig,
    ) -> Self {
        Self {
            bus,
            pipeline,
            cache,
            config,
        }
    }

    /// Register the built-in reply stages, then apply configured overrides.
    ///
    /// # Errors
    ///
    /// `PipelineError` if a stage is already registered or an override is
    /// invalid.
    pub fn register_stages(&self, overrides: &PipelineConfig) -> Result<(), PipelineError> {
        self.pipeline.register(
            stage_fn(STAGE_NORMALIZE, |reply: String| async move {
                Ok::<_, StageError>(Some(reply.split_whitespace().collect::<Vec<_>>().join(" ")))
            }),
            StageConfig::with_priority(10),
        )?;

        let max_chars = self.config.max_reply_chars;
        self.pipeline.register(
            stage_fn(STAGE_LENGTH_LIMIT, move |reply: String| async move {
                if reply.is_empty() {
                    return Ok::<_, StageError>(None);
                }
                Ok(Some(truncate_chars(&reply, max_chars)))
            }),
            StageConfig::with_priority(50).error_handling(ErrorHandling::Drop),
        )?;

        let applied = self.pipeline.apply_config(overrides)?;
        log_event!(
            info,
            COMPONENT,
            "Reply stages registered",
            stages = ?self.pipeline.stage_names(),
            overrides = applied
        );
        Ok(())
    }

    /// Subscribe to inbound messages.
    ///
    /// # Errors
    ///
    /// `DomainBusError` if the subscription is rejected.
    pub fn attach(self: &Arc<Self>) -> Result<SubscriptionId, DomainBusError> {
        let domain = Arc::clone(self);
        self.bus.subscribe(
            INGESTION_MESSAGE_READY,
            handler_fn("decision.responder", move |event| {
                let domain = Arc::clone(&domain);
                async move { domain.handle_message(&event).await }
            }),
        )
    }

    /// Handle one `ingestion.message.ready` event.
    ///
    /// # Errors
    ///
    /// `HandlerError` for a malformed event or an aborted pipeline run.
    pub async fn handle_message(&self, event: &Event) -> Result<(), HandlerError> {
        let text = event
            .payload_str("text")
            .ok_or_else(|| HandlerError::failed("message without text"))?;
        let author = event.payload_str("author").unwrap_or("anonymous");
        let message_id = event.payload_str("message_id").unwrap_or_default().to_string();

        let outcome = {
            let _timer = time_histogram!(PIPELINE_PROCESS_DURATION);
            self.pipeline.process(compose_reply(author, text)).await
        };

        match outcome {
            Ok(Some(reply)) => self.publish_intent(&message_id, reply).await,
            Ok(None) => {
                self.skip(&message_id, "dropped by pipeline").await?;
                Ok(())
            }
            Err(e) => {
                log_event!(warn, COMPONENT, "Reply pipeline aborted", message_id = %message_id, error = %e);
                self.skip(&message_id, &e.to_string()).await?;
                Err(HandlerError::failed(e.to_string()))
            }
        }
    }

    async fn publish_intent(&self, message_id: &str, reply: String) -> Result<(), HandlerError> {
        let payload = if reply.len() > self.config.inline_text_limit {
            let length = reply.len();
            let key = self
                .cache
                .store(
                    CachePayload::Text(reply),
                    StoreOptions::new()
                        .kind("text")
                        .ttl(self.config.reply_ttl)
                        .tag("message_id", message_id),
                )
                .await
                .map_err(|e| HandlerError::failed(e.to_string()))?;
            json!({ "reply_to": message_id, "ref": key.to_string(), "length": length })
        } else {
            json!({ "reply_to": message_id, "text": reply })
        };

        self.emit(DECISION_INTENT_GENERATED, payload).await
    }

    async fn skip(&self, message_id: &str, reason: &str) -> Result<(), HandlerError> {
        self.emit(
            DECISION_MESSAGE_SKIPPED,
            json!({ "message_id": message_id, "reason": reason }),
        )
        .await
    }

    async fn emit(&self, topic: &str, payload: Value) -> Result<(), HandlerError> {
        self.bus
            .emit(topic, payload, "responder")
            .await
            .map_err(|e| HandlerError::failed(e.to_string()))?;
        log_topic_event!(debug, COMPONENT, "Decision published", topic);
        Ok(())
    }
}
