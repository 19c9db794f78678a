//! Outbound Ports (Driven Ports)
//!
//! What the channel calls into: the subscriber's callbacks.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{CallbackError, StreamChunk, StreamMetadata};

/// Consumer of a stream (Driven Port).
///
/// Callbacks run on the subscriber's own consumer task, one at a time and in
/// queue order: `on_start`, the stream's chunks, `on_end`. A slow or failing
/// subscriber never affects other subscribers.
#[async_trait]
pub trait StreamSubscriber<T: StreamChunk>: Send + Sync {
    async fn on_chunk(&self, chunk: Arc<T>) -> Result<(), CallbackError>;

    async fn on_start(&self, _metadata: &StreamMetadata) -> Result<(), CallbackError> {
        Ok(())
    }

    async fn on_end(&self, _metadata: &StreamMetadata) -> Result<(), CallbackError> {
        Ok(())
    }
}
