//! # Core Entities
//!
//! The `Event` record dispatched by the bus and the opaque subscription
//! handle returned by the bus and the stream channel.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Domain;
use crate::time::{now_millis, Timestamp};

/// Event payload. Opaque to the bus; large data travels as a `cache://` reference.
pub type Payload = serde_json::Value;

/// A named event emitted on the bus.
///
/// Handlers receive events as `Arc<Event>`; an event is never mutated after
/// it has been emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Hierarchical dot-separated topic (`domain.kind.action`).
    pub topic: String,
    /// Event data.
    pub payload: Payload,
    /// Component that emitted the event.
    pub source: String,
    /// Unix time in milliseconds when the event was created.
    pub timestamp: Timestamp,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(topic: impl Into<String>, payload: Payload, source: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload,
            source: source.into(),
            timestamp: now_millis(),
        }
    }

    /// Override the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The domain owning this event's topic, if any.
    pub fn domain(&self) -> Option<Domain> {
        Domain::from_topic(&self.topic)
    }

    /// Look up a string field in an object payload.
    pub fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(|v| v.as_str())
    }
}

/// Opaque subscription handle.
///
/// Every `subscribe` call yields a fresh id, stable for the lifetime of the
/// subscription and required to remove it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// A fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// A fresh id prefixed with a human readable name (`name/uuid`).
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self(format!("{name}/{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::DECISION_INTENT_GENERATED;
    use serde_json::json;

    #[test]
    fn test_event_new() {
        let event = Event::new(
            DECISION_INTENT_GENERATED,
            json!({"text": "hello", "ref": "cache://text/0123456789ab"}),
            "decision.responder",
        );
        assert_eq!(event.topic, DECISION_INTENT_GENERATED);
        assert_eq!(event.domain(), Some(Domain::Decision));
        assert_eq!(event.payload_str("text"), Some("hello"));
        assert_eq!(event.payload_str("missing"), None);
        assert!(event.timestamp > 0);
    }

    #[test]
    fn test_event_serde() {
        let event = Event::new("system.tick", json!(42), "test").with_timestamp(7);
        let text = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&text).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.domain(), None);
    }

    #[test]
    fn test_subscription_ids_are_fresh() {
        let a = SubscriptionId::new();
        let b = SubscriptionId::new();
        assert_ne!(a, b);

        let named = SubscriptionId::named("tts");
        assert!(named.as_str().starts_with("tts/"));
        assert_ne!(named, SubscriptionId::named("tts"));
    }
}
