//! # Bus Errors

use shared_types::TopicError;
use thiserror::Error;

/// Errors returned to callers of the bus API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Topic failed validation.
    #[error("Invalid topic: {0}")]
    InvalidTopic(#[from] TopicError),

    /// `*` is a subscription pattern, not an emittable topic.
    #[error("Cannot emit on the wildcard topic")]
    WildcardEmit,

    /// Tap pattern is neither `*`, an exact topic, nor `prefix.*`.
    #[error("Invalid tap pattern: {0}")]
    InvalidPattern(String),
}

/// A handler fault. Recorded in the `DispatchResult`, never propagated to
/// the emitter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("Handler failed: {0}")]
    Failed(String),

    /// The handler panicked.
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Shorthand for `HandlerError::Failed`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors from tap operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TapError {
    /// The event bus was dropped.
    #[error("Event bus closed")]
    Closed,
}
