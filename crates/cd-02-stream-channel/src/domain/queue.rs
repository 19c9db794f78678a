//! # Subscriber Queue
//!
//! Bounded FIFO of chunks interleaved with start/end markers. Only chunks
//! count toward the bound; markers always fit so a stream's lifecycle
//! callbacks stay ordered with its chunks.

use std::collections::VecDeque;
use std::sync::Arc;

use super::config::BackpressurePolicy;
use super::entities::{StreamChunk, StreamMetadata};

/// An entry in a subscriber queue. `A` is the acknowledgement handle
/// carried by markers.
pub enum QueueItem<T, A> {
    Start(Arc<StreamMetadata>, A),
    Chunk(Arc<T>),
    End(Arc<StreamMetadata>, A),
}

/// Result of offering a chunk without waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Enqueued,
    /// `DropNewest`: the offered chunk was discarded.
    DroppedNewest,
    /// `DropOldest`: the oldest queued chunk (this sequence) was discarded
    /// and the offered chunk enqueued.
    DroppedOldest(u64),
    /// Queue full under `Block` or `FailFast`; nothing changed.
    Full,
    Closed,
}

pub struct ChunkQueue<T, A> {
    items: VecDeque<QueueItem<T, A>>,
    chunks: usize,
    capacity: usize,
    closed: bool,
}

impl<T: StreamChunk, A> ChunkQueue<T, A> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity + 2),
            chunks: 0,
            capacity,
            closed: false,
        }
    }

    pub fn has_room(&self) -> bool {
        self.chunks < self.capacity
    }

    /// Offer a chunk, applying `policy` if the queue is full.
    pub fn offer(&mut self, chunk: Arc<T>, policy: BackpressurePolicy) -> Offer {
        if self.closed {
            return Offer::Closed;
        }
        if self.has_room() {
            self.push_chunk(chunk);
            return Offer::Enqueued;
        }

        match policy {
            BackpressurePolicy::DropNewest => Offer::DroppedNewest,
            BackpressurePolicy::DropOldest => match self.pop_oldest_chunk() {
                Some(oldest) => {
                    self.push_chunk(chunk);
                    Offer::DroppedOldest(oldest.sequence())
                }
                None => Offer::Full,
            },
            BackpressurePolicy::Block | BackpressurePolicy::FailFast => Offer::Full,
        }
    }

    fn push_chunk(&mut self, chunk: Arc<T>) {
        self.items.push_back(QueueItem::Chunk(chunk));
        self.chunks += 1;
    }

    fn pop_oldest_chunk(&mut self) -> Option<Arc<T>> {
        let index = self
            .items
            .iter()
            .position(|item| matches!(item, QueueItem::Chunk(_)))?;
        match self.items.remove(index) {
            Some(QueueItem::Chunk(chunk)) => {
                self.chunks -= 1;
                Some(chunk)
            }
            _ => None,
        }
    }

    /// Append a start/end marker. Hands the item back if the queue is closed.
    pub fn push_marker(&mut self, item: QueueItem<T, A>) -> Result<(), QueueItem<T, A>> {
        if self.closed {
            return Err(item);
        }
        if matches!(item, QueueItem::Chunk(_)) {
            self.chunks += 1;
        }
        self.items.push_back(item);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<QueueItem<T, A>> {
        let item = self.items.pop_front()?;
        if matches!(item, QueueItem::Chunk(_)) {
            self.chunks -= 1;
        }
        Some(item)
    }

    /// Close and discard everything queued. Returns the number of chunks
    /// discarded.
    pub fn close(&mut self) -> usize {
        let discarded = self.chunks;
        self.closed = true;
        self.items.clear();
        self.chunks = 0;
        discarded
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Chunks currently queued.
    pub fn len(&self) -> usize {
        self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sequences of the queued chunks, oldest first.
    pub fn sequences(&self) -> Vec<u64> {
        self.items
            .iter()
            .filter_map(|item| match item {
                QueueItem::Chunk(chunk) => Some(chunk.sequence()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::AudioChunk;

    fn chunk(sequence: u64) -> Arc<AudioChunk> {
        Arc::new(AudioChunk::new(vec![0; 4], 16_000, 1, sequence))
    }

    fn fill(policy: BackpressurePolicy) -> (ChunkQueue<AudioChunk, ()>, Vec<Offer>) {
        let mut queue = ChunkQueue::new(2);
        let offers = (1..=5).map(|s| queue.offer(chunk(s), policy)).collect();
        (queue, offers)
    }

    #[test]
    fn test_drop_newest_keeps_first() {
        let (queue, offers) = fill(BackpressurePolicy::DropNewest);
        assert_eq!(queue.sequences(), vec![1, 2]);
        let dropped = offers
            .iter()
            .filter(|o| **o == Offer::DroppedNewest)
            .count();
        assert_eq!(dropped, 3);
    }

    #[test]
    fn test_drop_oldest_keeps_last() {
        let (queue, offers) = fill(BackpressurePolicy::DropOldest);
        assert_eq!(queue.sequences(), vec![4, 5]);
        assert_eq!(
            &offers[2..],
            &[
                Offer::DroppedOldest(1),
                Offer::DroppedOldest(2),
                Offer::DroppedOldest(3)
            ]
        );
    }

    #[test]
    fn test_block_and_fail_fast_leave_queue_untouched() {
        for policy in [BackpressurePolicy::Block, BackpressurePolicy::FailFast] {
            let (queue, offers) = fill(policy);
            assert_eq!(queue.sequences(), vec![1, 2]);
            assert_eq!(offers.iter().filter(|o| **o == Offer::Full).count(), 3);
        }
    }

    #[test]
    fn test_markers_do_not_count() {
        let mut queue: ChunkQueue<AudioChunk, ()> = ChunkQueue::new(1);
        let meta = Arc::new(StreamMetadata::new("s1", "pcm_s16le"));
        assert!(queue.push_marker(QueueItem::Start(meta.clone(), ())).is_ok());
        assert_eq!(queue.offer(chunk(1), BackpressurePolicy::FailFast), Offer::Enqueued);
        assert!(queue.push_marker(QueueItem::End(meta, ())).is_ok());
        assert_eq!(queue.len(), 1);

        assert!(matches!(queue.pop(), Some(QueueItem::Start(..))));
        assert!(matches!(queue.pop(), Some(QueueItem::Chunk(_))));
        assert!(matches!(queue.pop(), Some(QueueItem::End(..))));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_drop_oldest_skips_markers() {
        let mut queue: ChunkQueue<AudioChunk, ()> = ChunkQueue::new(1);
        let meta = Arc::new(StreamMetadata::new("s1", "pcm_s16le"));
        queue.push_marker(QueueItem::Start(meta, ())).ok();
        queue.offer(chunk(1), BackpressurePolicy::DropOldest);
        assert_eq!(
            queue.offer(chunk(2), BackpressurePolicy::DropOldest),
            Offer::DroppedOldest(1)
        );
        assert!(matches!(queue.pop(), Some(QueueItem::Start(..))));
        assert_eq!(queue.sequences(), vec![2]);
    }

    #[test]
    fn test_close_discards() {
        let (mut queue, _) = fill(BackpressurePolicy::DropNewest);
        assert_eq!(queue.close(), 2);
        assert!(queue.is_closed());
        assert_eq!(queue.offer(chunk(9), BackpressurePolicy::DropNewest), Offer::Closed);
        let meta = Arc::new(StreamMetadata::new("s1", "pcm"));
        assert!(queue.push_marker(QueueItem::End(meta, ())).is_err());
    }
}
