//! Chunks, stream metadata, and the records returned by channel operations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared_types::{SubscriptionId, Timestamp};

use super::config::BackpressurePolicy;
use super::errors::{DeliveryError, NotifyError};

/// A unit of a continuous stream.
///
/// Chunks are shared with every subscriber as `Arc<T>` and never mutated
/// after publish.
pub trait StreamChunk: Send + Sync + 'static {
    /// Position in the stream; strictly increasing between `notify_start`
    /// calls.
    fn sequence(&self) -> u64;
}

/// A block of PCM audio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioChunk {
    pub data: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    pub sequence: u64,
    pub timestamp: Timestamp,
}

impl AudioChunk {
    pub fn new(data: Vec<u8>, sample_rate: u32, channels: u16, sequence: u64) -> Self {
        Self {
            data,
            sample_rate,
            channels,
            sequence,
            timestamp: shared_types::now_millis(),
        }
    }

    /// Playback length in milliseconds, assuming 16-bit samples.
    pub fn duration_ms(&self) -> u64 {
        let bytes_per_second = u64::from(self.sample_rate) * u64::from(self.channels) * 2;
        if bytes_per_second == 0 {
            return 0;
        }
        self.data.len() as u64 * 1000 / bytes_per_second
    }
}

impl StreamChunk for AudioChunk {
    fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Stream-level information sent once at stream start and once at stream end.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamMetadata {
    pub stream_id: String,
    /// Codec or sample format, e.g. `pcm_s16le`.
    pub format: String,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl StreamMetadata {
    pub fn new(stream_id: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            format: format.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_audio(mut self, sample_rate: u32, channels: u16) -> Self {
        self.sample_rate = Some(sample_rate);
        self.channels = Some(channels);
        self
    }
}

/// Outcome of one `publish` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishResult {
    pub sequence: u64,
    /// Subscribers whose queue accepted the chunk.
    pub delivered: usize,
    /// Chunks displaced by this call (`DropNewest` discards the incoming one,
    /// `DropOldest` the oldest queued one).
    pub dropped: usize,
    /// Subscribers that did not receive the chunk and why.
    pub errors: BTreeMap<SubscriptionId, DeliveryError>,
    /// Callback failures reported by consumers since the previous publish.
    pub consumer_faults: BTreeMap<SubscriptionId, String>,
}

impl PublishResult {
    pub fn new(sequence: u64) -> Self {
        Self {
            sequence,
            ..Default::default()
        }
    }

    pub fn success_count(&self) -> usize {
        self.delivered
    }

    pub fn drop_count(&self) -> usize {
        self.dropped
    }

    /// Delivered everywhere with nothing dropped and no faults.
    pub fn is_clean(&self) -> bool {
        self.dropped == 0 && self.errors.is_empty() && self.consumer_faults.is_empty()
    }
}

/// Outcome of `notify_start` / `notify_end`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyResult {
    /// Subscribers whose callback completed successfully.
    pub notified: usize,
    pub errors: BTreeMap<SubscriptionId, NotifyError>,
}

impl NotifyResult {
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Per-subscriber counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberStats {
    pub id: SubscriptionId,
    pub name: String,
    pub policy: BackpressurePolicy,
    pub queue_size: usize,
    /// Chunks currently waiting.
    pub queued: usize,
    pub enqueued: u64,
    pub consumed: u64,
    pub dropped: u64,
    pub rejected: u64,
    pub callback_errors: u64,
}

/// Channel-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub running: bool,
    pub subscribers: usize,
    pub chunks_published: u64,
    pub last_sequence: Option<u64>,
}
