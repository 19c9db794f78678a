//! # Topic Namespace
//!
//! Topics are hierarchical dot-separated strings: `domain.kind.action`.
//! The first segment names the domain that owns (publishes) the topic.
//!
//! ```text
//! ingestion.message.ready ──→ decision.intent.generated ──→ presentation.intent.ready
//!                                                               │
//!                                                               └──→ presentation.<device>.<action>
//! ```
//!
//! Topics whose first segment is not a known domain (e.g. `system.shutdown`)
//! are infrastructure topics and are exempt from the domain flow rules.

use crate::errors::TopicError;

/// Subscribing to this topic receives every event emitted on the bus.
pub const WILDCARD_TOPIC: &str = "*";

// =============================================================================
// INGESTION
// =============================================================================

/// A normalized inbound message is ready for decision making.
pub const INGESTION_MESSAGE_READY: &str = "ingestion.message.ready";

/// An ingestion source connected or disconnected.
pub const INGESTION_SOURCE_STATUS: &str = "ingestion.source.status";

// =============================================================================
// DECISION
// =============================================================================

/// A response intent was generated from one or more inbound messages.
pub const DECISION_INTENT_GENERATED: &str = "decision.intent.generated";

/// The decision domain skipped a message (filtered, rate limited, ...).
pub const DECISION_MESSAGE_SKIPPED: &str = "decision.message.skipped";

// =============================================================================
// PRESENTATION
// =============================================================================

/// A post-processed intent is ready for output devices.
pub const PRESENTATION_INTENT_READY: &str = "presentation.intent.ready";

/// An output device finished rendering an intent.
pub const PRESENTATION_OUTPUT_RENDERED: &str = "presentation.output.rendered";

/// Builds a device-scoped presentation topic: `presentation.<device>.<action>`.
pub fn presentation_topic(device: &str, action: &str) -> String {
    format!("presentation.{device}.{action}")
}

/// Validate a topic name.
///
/// # Rules
///
/// - Non-empty, no whitespace
/// - No empty segments (`a..b`, `.a`, `a.`)
/// - `*` is only valid as the whole topic
///
/// # Errors
///
/// Returns `TopicError` describing the first rule that failed.
pub fn validate_topic(topic: &str) -> Result<(), TopicError> {
    if topic.is_empty() {
        return Err(TopicError::Empty);
    }
    if topic == WILDCARD_TOPIC {
        return Ok(());
    }
    if topic.chars().any(char::is_whitespace) {
        return Err(TopicError::Whitespace(topic.to_string()));
    }
    if topic.contains('*') {
        return Err(TopicError::MisplacedWildcard(topic.to_string()));
    }
    if topic.split('.').any(str::is_empty) {
        return Err(TopicError::EmptySegment(topic.to_string()));
    }
    Ok(())
}

/// Match a topic against a pattern.
///
/// The pattern can be an exact topic, `*` (everything), or a trailing
/// wildcard prefix such as `presentation.*`.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    if pattern == WILDCARD_TOPIC {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => topic.starts_with(prefix),
        None => pattern == topic,
    }
}
