//! # Ingestion Domain
//!
//! Normalizes inbound messages from any source (console, chat, speech
//! recognition) and publishes them as `ingestion.message.ready`.
//!
//! Ingestion is the head of the flow: it consumes nothing from the other
//! domains.

use std::sync::atomic::{AtomicU64, Ordering};

use conduit_telemetry::log_topic_event;
use serde_json::json;
use shared_types::topics::{INGESTION_MESSAGE_READY, INGESTION_SOURCE_STATUS};

use crate::adapters::{DomainBus, DomainBusError};

const COMPONENT: &str = "ingestion";

/// A message as received from a source, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Source identifier (`stdin`, `twitch`, `asr`).
    pub source: String,
    pub author: String,
    pub text: String,
}

impl InboundMessage {
    pub fn new(
        source: impl Into<String>,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            author: author.into(),
            text: text.into(),
        }
    }
}

/// Collapse runs of whitespace and trim.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct IngestionDomain {
    bus: DomainBus,
    received: AtomicU64,
    published: AtomicU64,
}

impl IngestionDomain {
    pub fn new(bus: DomainBus) -> Self {
        Self {
            bus,
            received: AtomicU64::new(0),
            published: AtomicU64::new(0),
        }
    }

    /// Normalize and publish a message.
    ///
    /// Returns `false` if the message was empty after normalization and
    /// nothing was published.
    ///
    /// # Errors
    ///
    /// `DomainBusError` if the bus rejects the event.
    pub async fn submit(&self, message: InboundMessage) -> Result<bool, DomainBusError> {
        let sequence = self.received.fetch_add(1, Ordering::Relaxed);
        let text = normalize_text(&message.text);
        if text.is_empty() {
            tracing::debug!(source = %message.source, "Ignoring empty message");
            return Ok(false);
        }

        let author = match normalize_text(&message.author) {
            a if a.is_empty() => "anonymous".to_string(),
            a => a,
        };
        let message_id = format!("{}-{sequence}", message.source);

        let result = self
            .bus
            .emit(
                INGESTION_MESSAGE_READY,
                json!({
                    "message_id": message_id,
                    "source": message.source,
                    "author": author,
                    "text": text,
                }),
                &message.source,
            )
            .await?;

        self.published.fetch_add(1, Ordering::Relaxed);
        log_topic_event!(
            debug,
            COMPONENT,
            "Message published",
            INGESTION_MESSAGE_READY,
            message_id = %message_id,
            handlers = result.handler_count()
        );
        Ok(true)
    }

    /// Announce that a source connected or disconnected.
    ///
    /// # Errors
    ///
    /// `DomainBusError` if the bus rejects the event.
    pub async fn source_status(&self, source: &str, connected: bool) -> Result<(), DomainBusError> {
        self.bus
            .emit(
                INGESTION_SOURCE_STATUS,
                json!({ "source": source, "connected": connected }),
                source,
            )
            .await?;
        log_topic_event!(info, COMPONENT, "Source status", INGESTION_SOURCE_STATUS, source, connected);
        Ok(())
    }

    /// Messages submitted, including ignored empty ones.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Messages published on the bus.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
