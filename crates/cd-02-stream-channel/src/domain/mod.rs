//! Domain layer: chunks, queues, policies. No tasks, no locks.

pub mod config;
pub mod entities;
pub mod errors;
pub mod queue;

pub use config::{BackpressurePolicy, ChannelConfig, SubscriberConfig};
pub use entities::{
    AudioChunk, ChannelStats, NotifyResult, PublishResult, StreamChunk, StreamMetadata,
    SubscriberStats,
};
pub use errors::{CallbackError, DeliveryError, NotifyError, StreamError};
pub use queue::{ChunkQueue, Offer, QueueItem};
