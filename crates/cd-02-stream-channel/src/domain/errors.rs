//! Error types for the stream channel

use std::time::Duration;

use thiserror::Error;

/// Channel-level errors returned to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("Stream channel is not started")]
    NotStarted,

    #[error("Sequence {got} does not follow {last}")]
    SequenceRegression { last: u64, got: u64 },

    #[error("Invalid subscriber configuration: {0}")]
    InvalidConfig(String),
}

/// Why a chunk did not reach one subscriber. Scoped to that subscriber.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// `FailFast` subscriber's queue was full.
    #[error("Subscriber queue full")]
    QueueFull,

    /// `Block` subscriber did not free space within its `block_timeout`.
    #[error("Blocked longer than {0:?} waiting for queue space")]
    BlockTimeout(Duration),

    /// Subscription was removed while delivering.
    #[error("Subscriber closed")]
    Closed,
}

/// Error raised by a subscriber callback.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Per-subscriber failure of a start/end notification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Callback failed: {0}")]
    Callback(String),

    #[error("Callback did not complete within {0:?}")]
    Timeout(Duration),

    #[error("Subscriber closed before the notification was handled")]
    Closed,
}
