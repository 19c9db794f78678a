//! Subscriber and channel configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::StreamError;

/// What happens when a subscriber's queue is full at publish time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// Publisher waits for this subscriber, after serving the others.
    #[default]
    Block,
    /// Discard the incoming chunk for this subscriber.
    DropNewest,
    /// Discard the oldest queued chunk, then enqueue.
    DropOldest,
    /// Report `DeliveryError::QueueFull` for this subscriber.
    FailFast,
}

/// Per-subscriber settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriberConfig {
    /// Chunks buffered before the backpressure policy applies.
    pub queue_size: usize,
    pub policy: BackpressurePolicy,
    /// Upper bound on a `Block` wait. `None` waits indefinitely.
    #[serde(with = "shared_types::humantime_serde::option")]
    pub block_timeout: Option<Duration>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            queue_size: 64,
            policy: BackpressurePolicy::Block,
            block_timeout: None,
        }
    }
}

impl SubscriberConfig {
    pub fn new(queue_size: usize, policy: BackpressurePolicy) -> Self {
        Self {
            queue_size,
            policy,
            block_timeout: None,
        }
    }

    #[must_use]
    pub fn with_block_timeout(mut self, timeout: Duration) -> Self {
        self.block_timeout = Some(timeout);
        self
    }

    /// # Errors
    ///
    /// `StreamError::InvalidConfig` for a zero queue size or zero timeout.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.queue_size == 0 {
            return Err(StreamError::InvalidConfig("queue_size cannot be 0".into()));
        }
        if self.block_timeout.is_some_and(|t| t.is_zero()) {
            return Err(StreamError::InvalidConfig(
                "block_timeout cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

/// Channel-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// How long `notify_start`/`notify_end` wait for each subscriber.
    #[serde(with = "shared_types::humantime_serde")]
    pub notify_timeout: Duration,
    /// Applied by callers that subscribe without a specific config.
    pub subscriber_defaults: SubscriberConfig,
    /// Grace period for consumer tasks to exit on `stop`.
    #[serde(with = "shared_types::humantime_serde")]
    pub shutdown_grace: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            notify_timeout: Duration::from_secs(5),
            subscriber_defaults: SubscriberConfig::default(),
            shutdown_grace: Duration::from_secs(1),
        }
    }
}

impl ChannelConfig {
    /// # Errors
    ///
    /// `StreamError::InvalidConfig` naming the first invalid field.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.notify_timeout.is_zero() {
            return Err(StreamError::InvalidConfig(
                "notify_timeout cannot be 0".into(),
            ));
        }
        self.subscriber_defaults.validate()
    }
}
