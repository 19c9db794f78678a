//! # Event Taps
//!
//! Passive observers of the bus. A tap sees every emitted event matching its
//! pattern after handler dispatch has finished. Taps are lossy: a tap that
//! falls behind skips events instead of slowing the bus down.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use shared_types::{topic_matches, Event};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::errors::TapError;

/// A tap handle for receiving events.
///
/// Dropping the tap detaches it from the bus.
pub struct Tap {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<Arc<Event>>,

    /// `*`, an exact topic, or `prefix.*`.
    pattern: String,
}

impl Tap {
    pub(crate) fn new(receiver: broadcast::Receiver<Arc<Event>>, pattern: String) -> Self {
        Self { receiver, pattern }
    }

    /// Receive the next event that matches the pattern.
    ///
    /// # Returns
    ///
    /// - `Some(event)` - The next matching event
    /// - `None` - The bus was dropped
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, pattern = %self.pattern, "Tap lagged, some events skipped");
                    continue;
                }
            };

            if topic_matches(&self.pattern, &event.topic) {
                return Some(event);
            }
        }
    }

    /// Try to receive the next matching event without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was available and matched
    /// - `Ok(None)` - Nothing available right now
    /// - `Err(TapError::Closed)` - The bus was dropped
    pub fn try_recv(&mut self) -> Result<Option<Arc<Event>>, TapError> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(TapError::Closed),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if topic_matches(&self.pattern, &event.topic) {
                return Ok(Some(event));
            }
        }
    }

    /// Drain every matching event currently buffered.
    pub fn drain(&mut self) -> Vec<Arc<Event>> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.try_recv() {
            events.push(event);
        }
        events
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Convert into a `Stream` of matching events.
    pub fn into_stream(self) -> impl Stream<Item = Arc<Event>> + Send + Unpin {
        let pattern = self.pattern;
        BroadcastStream::new(self.receiver).filter_map(move |item| {
            let matched = match item {
                Ok(event) if topic_matches(&pattern, &event.topic) => Some(event),
                _ => None,
            };
            futures::future::ready(matched)
        })
    }
}
