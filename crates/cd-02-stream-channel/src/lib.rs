//! # CD-02 Stream Channel
//!
//! Pub/sub for a continuous sequence of typed chunks (synthesized audio is
//! the main user). Separate from the event bus: chunk-rate traffic must not
//! queue behind low-frequency control events, and each consumer needs its
//! own buffer and backpressure rule.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): chunk types, `ChunkQueue`, policies, results
//! - **Ports Layer** (`ports/`): `StreamSubscriber` (driven port)
//! - **Service Layer** (`service.rs`): `StreamChannel`, subscriber table and
//!   consumer tasks
//!
//! ## Backpressure Policies
//!
//! | Policy | Queue full at publish | Loses chunks |
//! |--------|----------------------|--------------|
//! | `Block` | publisher waits for this subscriber (optionally bounded) | no |
//! | `DropNewest` | incoming chunk discarded for this subscriber | yes, counted |
//! | `DropOldest` | oldest queued chunk discarded, incoming enqueued | yes, counted |
//! | `FailFast` | `DeliveryError::QueueFull` for this subscriber | no |
//!
//! ## Stream Lifecycle
//!
//! ```text
//! start() → subscribe(..) → notify_start(meta) → publish(1..n) → notify_end(meta) → stop()
//! ```
//!
//! Start and end notifications travel through each subscriber's queue, so a
//! subscriber sees `on_start`, then its chunks, then `on_end`, in that order.
//!
//! ## Usage Example
//!
//! ```ignore
//! let channel: StreamChannel<AudioChunk> = StreamChannel::new(ChannelConfig::default())?;
//! channel.start();
//! let id = channel.subscribe("speaker", player, SubscriberConfig::new(32, BackpressurePolicy::Block))?;
//!
//! channel.notify_start(StreamMetadata::new("utt-1", "pcm_s16le")).await;
//! let result = channel.publish(AudioChunk::new(pcm, 24_000, 1, 1)).await?;
//! if !result.is_clean() {
//!     warn!(dropped = result.drop_count(), "Listeners fell behind");
//! }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    AudioChunk, BackpressurePolicy, CallbackError, ChannelConfig, ChannelStats, DeliveryError,
    NotifyError, NotifyResult, PublishResult, StreamChunk, StreamError, StreamMetadata,
    SubscriberConfig, SubscriberStats,
};
pub use ports::StreamSubscriber;
pub use service::StreamChannel;
