//! # Error Types
//!
//! Defines error types shared across components.

use thiserror::Error;

use crate::domain::Domain;

/// Topic name rejected by `validate_topic`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    /// Topic is the empty string.
    #[error("Topic must not be empty")]
    Empty,

    /// Topic contains whitespace.
    #[error("Topic contains whitespace: {0:?}")]
    Whitespace(String),

    /// Topic contains an empty segment.
    #[error("Topic contains an empty segment: {0:?}")]
    EmptySegment(String),

    /// `*` used anywhere but as the whole topic.
    #[error("Wildcard is only valid as the whole topic: {0:?}")]
    MisplacedWildcard(String),
}

/// A publish or subscribe that violates the ingestion → decision → presentation flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowViolation {
    /// A domain tried to publish a topic owned by another domain.
    #[error("Domain {publisher} may not publish {topic} (owned by {owner})")]
    ForeignPublish {
        publisher: Domain,
        owner: Domain,
        topic: String,
    },

    /// A domain tried to consume a topic from a downstream domain.
    #[error("Domain {subscriber} may not consume {topic} (downstream domain {owner})")]
    UpstreamConsumption {
        subscriber: Domain,
        owner: Domain,
        topic: String,
    },

    /// A domain tried to subscribe to every topic.
    #[error("Domain {subscriber} may not subscribe to the wildcard topic")]
    WildcardSubscription { subscriber: Domain },

    /// A domain referenced another domain's code directly.
    #[error("Domain {from} references domain {to} directly")]
    DirectDependency { from: Domain, to: Domain },
}
