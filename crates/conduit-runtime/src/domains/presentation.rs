//! # Presentation Domain
//!
//! Renders `decision.intent.generated` for the output devices:
//!
//! 1. Resolve the reply text (inline, or from the cache for `cache://` refs)
//! 2. Publish `presentation.intent.ready` and `presentation.subtitle.show`
//! 3. Stream the rendered speech through the stream channel
//! 4. Publish `presentation.output.rendered`
//!
//! Speech synthesis is an external collaborator. The reference renderer
//! streams silence of the right length so that playback subscribers and
//! backpressure behave as they would with real audio.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cd_01_data_cache::{CacheKey, CachePayload, DataCache, DataCacheApi};
use cd_02_stream_channel::{
    AudioChunk, CallbackError, StreamChannel, StreamMetadata, StreamSubscriber,
};
use conduit_telemetry::{log_cache_event, log_event};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_bus::{handler_fn, HandlerError};
use shared_types::topics::{
    presentation_topic, DECISION_INTENT_GENERATED, PRESENTATION_INTENT_READY,
    PRESENTATION_OUTPUT_RENDERED,
};
use shared_types::{Event, SubscriptionId};
use tokio::sync::Mutex;

use crate::adapters::{DomainBus, DomainBusError};

const COMPONENT: &str = "presentation";

/// Presentation domain configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Characters of text rendered per audio chunk.
    pub chars_per_chunk: usize,
    /// Speech duration per character.
    pub ms_per_char: u64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            chars_per_chunk: 24,
            ms_per_char: 60,
        }
    }
}

impl PresentationConfig {
    /// # Errors
    ///
    /// A description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 || self.channels == 0 {
            return Err("presentation.sample_rate and channels must be non-zero".into());
        }
        if self.chars_per_chunk == 0 {
            return Err("presentation.chars_per_chunk cannot be 0".into());
        }
        Ok(())
    }

    /// Bytes of 16-bit PCM for `chars` characters of speech.
    pub fn pcm_bytes(&self, chars: usize) -> usize {
        let samples = chars as u64 * self.ms_per_char * u64::from(self.sample_rate) / 1000;
        (samples * u64::from(self.channels) * 2) as usize
    }
}

pub struct PresentationDomain {
    bus: DomainBus,
    cache: Arc<DataCache>,
    stream: Arc<StreamChannel<AudioChunk>>,
    config: PresentationConfig,
    next_stream: AtomicU64,
    /// Held for a whole stream; the channel carries one stream at a time.
    speaking: Mutex<()>,
}

impl PresentationDomain {
    pub fn new(
        bus: DomainBus,
        cache: Arc<DataCache>,
        stream: Arc<StreamChannel<AudioChunk>>,
        config: PresentationConfig,
    ) -> Self {
        Self {
            bus,
            cache,
            stream,
            config,
            next_stream: AtomicU64::new(0),
            speaking: Mutex::new(()),
        }
    }

    /// Subscribe to generated intents.
    ///
    /// # Errors
    ///
    /// `DomainBusError` if the subscription is rejected.
    pub fn attach(self: &Arc<Self>) -> Result<SubscriptionId, DomainBusError> {
        let domain = Arc::clone(self);
        self.bus.subscribe(
            DECISION_INTENT_GENERATED,
            handler_fn("presentation.renderer", move |event| {
                let domain = Arc::clone(&domain);
                async move { domain.handle_intent(&event).await }
            }),
        )
    }

    /// Handle one `decision.intent.generated` event.
    ///
    /// # Errors
    ///
    /// `HandlerError` if the text cannot be resolved or an event is rejected.
    pub async fn handle_intent(&self, event: &Event) -> Result<(), HandlerError> {
        let text = self.resolve_text(event).await?;
        let reply_to = event.payload_str("reply_to").unwrap_or_default();

        self.emit(
            PRESENTATION_INTENT_READY,
            json!({ "reply_to": reply_to, "text": text }),
        )
        .await?;
        self.emit(
            &presentation_topic("subtitle", "show"),
            json!({ "reply_to": reply_to, "text": text }),
        )
        .await?;

        let (stream_id, chunks) = self.render(&text).await;

        self.emit(
            PRESENTATION_OUTPUT_RENDERED,
            json!({
                "reply_to": reply_to,
                "device": "speech",
                "stream_id": stream_id,
                "chunks": chunks,
            }),
        )
        .await
    }

    /// Inline `text`, or the cached text behind `ref`.
    async fn resolve_text(&self, event: &Event) -> Result<String, HandlerError> {
        if let Some(text) = event.payload_str("text") {
            return Ok(text.to_string());
        }
        let reference = event
            .payload_str("ref")
            .ok_or_else(|| HandlerError::failed("intent without text or ref"))?;
        let key = CacheKey::parse(reference).map_err(|e| HandlerError::failed(e.to_string()))?;

        match self.cache.retrieve(&key).await {
            Ok(CachePayload::Text(text)) => {
                log_cache_event!(debug, COMPONENT, "Reply resolved from cache", key);
                Ok(text)
            }
            Ok(_) => Err(HandlerError::failed(format!("{key} does not hold text"))),
            Err(e) => {
                log_cache_event!(warn, COMPONENT, "Reply reference unresolved", key, error = %e);
                Err(HandlerError::failed(e.to_string()))
            }
        }
    }

    /// Stream `text` as audio. Returns the stream id and the number of
    /// chunks published.
    async fn render(&self, text: &str) -> (String, u64) {
        let _speaking = self.speaking.lock().await;
        let stream_id = format!("speech-{}", self.next_stream.fetch_add(1, Ordering::Relaxed));
        let metadata = StreamMetadata::new(&stream_id, "pcm_s16le")
            .with_audio(self.config.sample_rate, self.config.channels);

        let started = self.stream.notify_start(metadata.clone()).await;
        if !started.all_succeeded() {
            log_event!(warn, COMPONENT, "Stream start not acknowledged", stream_id = %stream_id, failed = started.errors.len());
        }

        let chars: Vec<char> = text.chars().collect();
        let mut sequence = 0;
        for piece in chars.chunks(self.config.chars_per_chunk) {
            let chunk = AudioChunk::new(
                vec![0; self.config.pcm_bytes(piece.len())],
                self.config.sample_rate,
                self.config.channels,
                sequence,
            );
            match self.stream.publish(chunk).await {
                Ok(result) if !result.is_clean() => {
                    log_event!(
                        debug,
                        COMPONENT,
                        "Chunk not delivered everywhere",
                        stream_id = %stream_id,
                        sequence,
                        dropped = result.drop_count(),
                        errors = result.errors.len(),
                        faults = result.consumer_faults.len()
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    log_event!(warn, COMPONENT, "Rendering aborted", stream_id = %stream_id, error = %e);
                    break;
                }
            }
            sequence += 1;
        }

        self.stream.notify_end(metadata).await;
        (stream_id, sequence)
    }

    async fn emit(&self, topic: &str, payload: serde_json::Value) -> Result<(), HandlerError> {
        self.bus
            .emit(topic, payload, "renderer")
            .await
            .map(|_| ())
            .map_err(|e| HandlerError::failed(e.to_string()))
    }
}

/// Playback device stand-in: consumes the rendered stream and counts what
/// it received.
#[derive(Default)]
pub struct PlaybackMonitor {
    streams: AtomicU64,
    chunks: AtomicU64,
    bytes: AtomicU64,
}

impl PlaybackMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Streams whose end was received.
    pub fn streams(&self) -> u64 {
        self.streams.load(Ordering::Relaxed)
    }

    pub fn chunks(&self) -> u64 {
        self.chunks.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl StreamSubscriber<AudioChunk> for PlaybackMonitor {
    async fn on_start(&self, metadata: &StreamMetadata) -> Result<(), CallbackError> {
        tracing::debug!(stream_id = %metadata.stream_id, "Playback started");
        Ok(())
    }

    async fn on_chunk(&self, chunk: Arc<AudioChunk>) -> Result<(), CallbackError> {
        self.chunks.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(chunk.data.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn on_end(&self, metadata: &StreamMetadata) -> Result<(), CallbackError> {
        self.streams.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(stream_id = %metadata.stream_id, "Playback finished");
        Ok(())
    }
}
