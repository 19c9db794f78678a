//! # Stream Channel Service
//!
//! Owns the subscriber table and one consumer task per subscriber.
//!
//! ```text
//!                      ┌── queue ──→ consumer task ──→ on_start / on_chunk / on_end
//! publish(chunk) ──────┼── queue ──→ consumer task ──→ ...
//!   (policy per queue) └── queue ──→ consumer task ──→ ...
//! ```
//!
//! `publish` makes one non-blocking pass over a snapshot of the table, then
//! waits only on the `Block` subscribers that were full. The table lock is
//! never held while delivering.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use parking_lot::Mutex;
use shared_types::SubscriptionId;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{
    BackpressurePolicy, CallbackError, ChannelConfig, ChannelStats, ChunkQueue, DeliveryError,
    NotifyError, NotifyResult, Offer, PublishResult, QueueItem, StreamChunk, StreamError,
    StreamMetadata, SubscriberConfig, SubscriberStats,
};
use crate::ports::StreamSubscriber;

type Ack = oneshot::Sender<Result<(), CallbackError>>;
type Item<T> = QueueItem<T, Ack>;

#[derive(Debug, Clone, Copy)]
enum Marker {
    Start,
    End,
}

#[derive(Default)]
struct SlotCounters {
    enqueued: AtomicU64,
    consumed: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
    callback_errors: AtomicU64,
}

/// One subscription: its queue, wakeups, counters, and consumer task.
struct SubscriberSlot<T: StreamChunk> {
    id: SubscriptionId,
    name: String,
    config: SubscriberConfig,
    queue: Mutex<ChunkQueue<T, Ack>>,
    /// Consumer side. `notify_one` keeps a permit if the consumer is busy.
    item_ready: Notify,
    /// Publisher side, for `Block` waits.
    space_ready: Notify,
    counters: SlotCounters,
    /// Most recent callback failure not yet reported through `publish`.
    last_fault: Mutex<Option<String>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: StreamChunk> SubscriberSlot<T> {
    fn new(id: SubscriptionId, name: &str, config: SubscriberConfig) -> Self {
        Self {
            id,
            name: name.to_string(),
            queue: Mutex::new(ChunkQueue::new(config.queue_size)),
            config,
            item_ready: Notify::new(),
            space_ready: Notify::new(),
            counters: SlotCounters::default(),
            last_fault: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    fn offer(&self, chunk: Arc<T>, policy: BackpressurePolicy) -> Offer {
        let offer = self.queue.lock().offer(chunk, policy);
        match offer {
            Offer::Enqueued => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                self.item_ready.notify_one();
            }
            Offer::DroppedOldest(_) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                self.item_ready.notify_one();
            }
            Offer::DroppedNewest => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Offer::Full | Offer::Closed => {}
        }
        offer
    }

    /// Wait until the chunk fits. Used for `Block` subscribers only.
    async fn wait_for_space(&self, chunk: Arc<T>) -> Result<(), DeliveryError> {
        loop {
            let notified = self.space_ready.notified();
            tokio::pin!(notified);
            // Register before re-checking so a pop in between is not missed.
            notified.as_mut().enable();

            match self.offer(chunk.clone(), BackpressurePolicy::Block) {
                Offer::Enqueued => return Ok(()),
                Offer::Closed => return Err(DeliveryError::Closed),
                _ => {}
            }
            notified.await;
        }
    }

    async fn deliver_blocking(&self, chunk: Arc<T>) -> Result<(), DeliveryError> {
        let outcome = match self.config.block_timeout {
            Some(limit) => tokio::time::timeout(limit, self.wait_for_space(chunk))
                .await
                .unwrap_or(Err(DeliveryError::BlockTimeout(limit))),
            None => self.wait_for_space(chunk).await,
        };
        if outcome.is_err() {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
        }
        outcome
    }

    fn push_marker(&self, item: Item<T>) -> bool {
        let pushed = self.queue.lock().push_marker(item).is_ok();
        if pushed {
            self.item_ready.notify_one();
        }
        pushed
    }

    async fn next_item(&self) -> Option<Item<T>> {
        loop {
            {
                let mut queue = self.queue.lock();
                if let Some(item) = queue.pop() {
                    return Some(item);
                }
                if queue.is_closed() {
                    return None;
                }
            }
            self.item_ready.notified().await;
        }
    }

    fn record_fault(&self, error: &CallbackError) {
        self.counters.callback_errors.fetch_add(1, Ordering::Relaxed);
        *self.last_fault.lock() = Some(error.to_string());
    }

    fn take_fault(&self) -> Option<String> {
        self.last_fault.lock().take()
    }

    /// Close the queue, discard what is queued, and wake everyone waiting.
    fn close(&self) {
        let discarded = self.queue.lock().close();
        self.item_ready.notify_one();
        self.space_ready.notify_waiters();
        debug!(subscription_id = %self.id, discarded, "Subscriber queue closed");
    }

    /// Wait for the consumer task to exit, aborting it after `grace`.
    async fn join(&self, grace: Duration) {
        let Some(mut task) = self.task.lock().take() else {
            return;
        };
        if tokio::time::timeout(grace, &mut task).await.is_err() {
            warn!(
                subscription_id = %self.id,
                subscriber = %self.name,
                "Consumer did not exit within grace period, aborting"
            );
            task.abort();
        }
    }

    fn stats(&self) -> SubscriberStats {
        SubscriberStats {
            id: self.id.clone(),
            name: self.name.clone(),
            policy: self.config.policy,
            queue_size: self.config.queue_size,
            queued: self.queue.lock().len(),
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            consumed: self.counters.consumed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            callback_errors: self.counters.callback_errors.load(Ordering::Relaxed),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Poll a callback future, converting a panic into a `CallbackError`.
async fn guarded<F>(callback: F) -> Result<(), CallbackError>
where
    F: std::future::Future<Output = Result<(), CallbackError>>,
{
    match AssertUnwindSafe(callback).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(CallbackError::new(format!(
            "callback panicked: {}",
            panic_message(panic.as_ref())
        ))),
    }
}

/// Consumer task body: drain the queue in order until it is closed.
async fn consume<T: StreamChunk>(
    slot: Arc<SubscriberSlot<T>>,
    subscriber: Arc<dyn StreamSubscriber<T>>,
) {
    while let Some(item) = slot.next_item().await {
        match item {
            QueueItem::Chunk(chunk) => {
                slot.space_ready.notify_waiters();
                let sequence = chunk.sequence();
                let result = guarded(subscriber.on_chunk(chunk)).await;
                slot.counters.consumed.fetch_add(1, Ordering::Relaxed);
                if let Err(error) = result {
                    warn!(
                        subscription_id = %slot.id,
                        subscriber = %slot.name,
                        sequence,
                        error = %error,
                        "Chunk callback failed"
                    );
                    slot.record_fault(&error);
                }
            }
            QueueItem::Start(metadata, ack) => {
                let result = guarded(subscriber.on_start(&metadata)).await;
                if let Err(error) = &result {
                    warn!(subscription_id = %slot.id, stream_id = %metadata.stream_id, error = %error, "Start callback failed");
                    slot.record_fault(error);
                }
                let _ = ack.send(result);
            }
            QueueItem::End(metadata, ack) => {
                let result = guarded(subscriber.on_end(&metadata)).await;
                if let Err(error) = &result {
                    warn!(subscription_id = %slot.id, stream_id = %metadata.stream_id, error = %error, "End callback failed");
                    slot.record_fault(error);
                }
                let _ = ack.send(result);
            }
        }
    }
    debug!(subscription_id = %slot.id, "Consumer exited");
}

/// Multi-subscriber chunk channel with per-subscriber backpressure.
///
/// Every subscriber gets its own bounded queue and consumer task, so a slow
/// or failing subscriber only ever affects the publisher through its own
/// `Block` policy.
///
/// A channel carries one stream at a time. The sequence check spans from one
/// `notify_start` to the next, so producers sharing a channel must not
/// interleave their streams.
pub struct StreamChannel<T: StreamChunk> {
    config: ChannelConfig,
    running: AtomicBool,
    table: Mutex<Vec<Arc<SubscriberSlot<T>>>>,
    last_sequence: Mutex<Option<u64>>,
    published: AtomicU64,
}

impl<T: StreamChunk> StreamChannel<T> {
    /// Create a stopped channel.
    ///
    /// # Errors
    ///
    /// `StreamError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: ChannelConfig) -> Result<Self, StreamError> {
        config.validate()?;
        Ok(Self {
            config,
            running: AtomicBool::new(false),
            table: Mutex::new(Vec::new()),
            last_sequence: Mutex::new(None),
            published: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn start(&self) {
        let _table = self.table.lock();
        if !self.running.swap(true, Ordering::SeqCst) {
            info!("Stream channel started");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the channel: close and clear every queue, remove every
    /// subscription, and wait for the consumer tasks to exit.
    ///
    /// Publishers blocked on a full queue are released with
    /// `DeliveryError::Closed`. The channel must be started again before
    /// further use.
    pub async fn stop(&self) {
        let slots = {
            let mut table = self.table.lock();
            self.running.store(false, Ordering::SeqCst);
            std::mem::take(&mut *table)
        };
        *self.last_sequence.lock() = None;

        for slot in &slots {
            slot.close();
        }
        for slot in &slots {
            slot.join(self.config.shutdown_grace).await;
        }
        info!(subscribers = slots.len(), "Stream channel stopped");
    }

    /// Subscribe with an explicit configuration.
    ///
    /// Names are labels only: subscribing the same name twice creates two
    /// independent subscriptions with distinct ids. Spawns the consumer
    /// task, so this must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// `StreamError::NotStarted` if the channel is not running, or
    /// `StreamError::InvalidConfig`.
    pub fn subscribe(
        &self,
        name: &str,
        subscriber: Arc<dyn StreamSubscriber<T>>,
        config: SubscriberConfig,
    ) -> Result<SubscriptionId, StreamError> {
        config.validate()?;

        let mut table = self.table.lock();
        if !self.is_running() {
            return Err(StreamError::NotStarted);
        }

        let id = SubscriptionId::named(name);
        let slot = Arc::new(SubscriberSlot::new(id.clone(), name, config));
        let task = tokio::spawn(consume(Arc::clone(&slot), subscriber));
        *slot.task.lock() = Some(task);

        debug!(
            subscription_id = %id,
            subscriber = name,
            policy = ?slot.config.policy,
            queue_size = slot.config.queue_size,
            "Stream subscriber added"
        );
        table.push(slot);
        Ok(id)
    }

    /// Subscribe with `ChannelConfig::subscriber_defaults`.
    ///
    /// # Errors
    ///
    /// See [`StreamChannel::subscribe`].
    pub fn subscribe_default(
        &self,
        name: &str,
        subscriber: Arc<dyn StreamSubscriber<T>>,
    ) -> Result<SubscriptionId, StreamError> {
        self.subscribe(name, subscriber, self.config.subscriber_defaults.clone())
    }

    /// Remove a subscription and discard its queue. The consumer finishes
    /// any callback in progress, then exits.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let slot = {
            let mut table = self.table.lock();
            let Some(index) = table.iter().position(|slot| &slot.id == id) else {
                return false;
            };
            table.remove(index)
        };
        slot.close();
        debug!(subscription_id = %id, "Stream subscriber removed");
        true
    }

    fn snapshot(&self) -> Vec<Arc<SubscriberSlot<T>>> {
        self.table.lock().clone()
    }

    /// Broadcast stream start. Resets the sequence check for the new stream.
    ///
    /// Each subscriber's `on_start` runs from its queue, after anything
    /// already queued. Waits at most `notify_timeout` per subscriber.
    pub async fn notify_start(&self, metadata: StreamMetadata) -> NotifyResult {
        *self.last_sequence.lock() = None;
        info!(stream_id = %metadata.stream_id, format = %metadata.format, "Stream started");
        self.broadcast(Marker::Start, metadata).await
    }

    /// Broadcast stream end, after each subscriber's queued chunks.
    pub async fn notify_end(&self, metadata: StreamMetadata) -> NotifyResult {
        info!(stream_id = %metadata.stream_id, "Stream ended");
        self.broadcast(Marker::End, metadata).await
    }

    async fn broadcast(&self, marker: Marker, metadata: StreamMetadata) -> NotifyResult {
        let metadata = Arc::new(metadata);
        let mut result = NotifyResult::default();
        let mut pending = Vec::new();

        for slot in self.snapshot() {
            let (ack, acked) = oneshot::channel();
            let item = match marker {
                Marker::Start => QueueItem::Start(Arc::clone(&metadata), ack),
                Marker::End => QueueItem::End(Arc::clone(&metadata), ack),
            };
            if slot.push_marker(item) {
                pending.push((slot.id.clone(), acked));
            } else {
                result.errors.insert(slot.id.clone(), NotifyError::Closed);
            }
        }

        let limit = self.config.notify_timeout;
        let outcomes = join_all(pending.into_iter().map(|(id, acked)| async move {
            let outcome = match tokio::time::timeout(limit, acked).await {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(error))) => Err(NotifyError::Callback(error.0)),
                Ok(Err(_)) => Err(NotifyError::Closed),
                Err(_) => Err(NotifyError::Timeout(limit)),
            };
            (id, outcome)
        }))
        .await;

        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => result.notified += 1,
                Err(error) => {
                    warn!(subscription_id = %id, marker = ?marker, error = %error, "Stream notification failed");
                    result.errors.insert(id, error);
                }
            }
        }
        result
    }

    /// Publish a chunk to every subscriber.
    ///
    /// Subscribers with room get the chunk immediately. Full queues apply
    /// their policy; `Block` subscribers are waited on last, concurrently,
    /// so they never delay delivery to the others.
    ///
    /// # Errors
    ///
    /// `StreamError::NotStarted`, or `StreamError::SequenceRegression` if
    /// the chunk's sequence does not exceed the previous one in this stream.
    /// Per-subscriber failures are reported in the `PublishResult`.
    pub async fn publish(&self, chunk: T) -> Result<PublishResult, StreamError> {
        if !self.is_running() {
            return Err(StreamError::NotStarted);
        }

        let sequence = chunk.sequence();
        {
            let mut last = self.last_sequence.lock();
            if let Some(previous) = *last {
                if sequence <= previous {
                    return Err(StreamError::SequenceRegression {
                        last: previous,
                        got: sequence,
                    });
                }
            }
            *last = Some(sequence);
        }

        let chunk = Arc::new(chunk);
        let mut result = PublishResult::new(sequence);
        let mut blocked = Vec::new();

        for slot in self.snapshot() {
            if let Some(fault) = slot.take_fault() {
                result.consumer_faults.insert(slot.id.clone(), fault);
            }

            match slot.offer(Arc::clone(&chunk), slot.config.policy) {
                Offer::Enqueued => result.delivered += 1,
                Offer::DroppedOldest(displaced) => {
                    debug!(subscription_id = %slot.id, sequence, displaced, "Dropped oldest chunk");
                    result.delivered += 1;
                    result.dropped += 1;
                }
                Offer::DroppedNewest => {
                    debug!(subscription_id = %slot.id, sequence, "Dropped newest chunk");
                    result.dropped += 1;
                }
                Offer::Full if slot.config.policy == BackpressurePolicy::Block => {
                    blocked.push(slot);
                }
                Offer::Full => {
                    slot.counters.rejected.fetch_add(1, Ordering::Relaxed);
                    result.errors.insert(slot.id.clone(), DeliveryError::QueueFull);
                }
                Offer::Closed => {
                    result.errors.insert(slot.id.clone(), DeliveryError::Closed);
                }
            }
        }

        if !blocked.is_empty() {
            let outcomes = join_all(blocked.iter().map(|slot| {
                let chunk = Arc::clone(&chunk);
                async move { (slot.id.clone(), slot.deliver_blocking(chunk).await) }
            }))
            .await;

            for (id, outcome) in outcomes {
                match outcome {
                    Ok(()) => result.delivered += 1,
                    Err(error) => {
                        warn!(subscription_id = %id, sequence, error = %error, "Blocked delivery failed");
                        result.errors.insert(id, error);
                    }
                }
            }
        }

        self.published.fetch_add(1, Ordering::Relaxed);
        Ok(result)
    }

    pub fn subscriber_count(&self) -> usize {
        self.table.lock().len()
    }

    /// Counters for every subscription, in subscription order.
    pub fn subscriber_stats(&self) -> Vec<SubscriberStats> {
        self.snapshot().iter().map(|slot| slot.stats()).collect()
    }

    pub fn subscriber_stats_for(&self, id: &SubscriptionId) -> Option<SubscriberStats> {
        self.snapshot()
            .iter()
            .find(|slot| &slot.id == id)
            .map(|slot| slot.stats())
    }

    /// Sequences waiting in one subscriber's queue, oldest first.
    pub fn queued_sequences(&self, id: &SubscriptionId) -> Option<Vec<u64>> {
        self.snapshot()
            .iter()
            .find(|slot| &slot.id == id)
            .map(|slot| slot.queue.lock().sequences())
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            running: self.is_running(),
            subscribers: self.subscriber_count(),
            chunks_published: self.published.load(Ordering::Relaxed),
            last_sequence: *self.last_sequence.lock(),
        }
    }
}

impl<T: StreamChunk> Drop for StreamChannel<T> {
    fn drop(&mut self) {
        for slot in self.table.get_mut().drain(..) {
            slot.close();
        }
    }
}
