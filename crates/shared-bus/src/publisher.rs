//! # Event Bus
//!
//! Topic registry and sequential, priority-ordered dispatch.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use parking_lot::RwLock;
use shared_types::{validate_topic, Event, Payload, SubscriptionId, WILDCARD_TOPIC};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::dispatch::{BusStats, DispatchResult, HandlerOutcome};
use crate::errors::{BusError, HandlerError};
use crate::handler::EventHandler;
use crate::subscriber::Tap;
use crate::{DEFAULT_PRIORITY, DEFAULT_TAP_CAPACITY};

/// One `subscribe` call.
struct Registration {
    id: SubscriptionId,
    priority: i32,
    /// Registration order, breaks priority ties.
    seq: u64,
    handler: Arc<dyn EventHandler>,
}

/// Handler lists per exact topic plus the wildcard bucket.
#[derive(Default)]
struct HandlerTable {
    by_topic: HashMap<String, Vec<Arc<Registration>>>,
    wildcard: Vec<Arc<Registration>>,
    /// Subscription id → topic, for O(1) bucket lookup on unsubscribe.
    index: HashMap<SubscriptionId, String>,
}

impl HandlerTable {
    fn bucket_mut(&mut self, topic: &str) -> &mut Vec<Arc<Registration>> {
        if topic == WILDCARD_TOPIC {
            &mut self.wildcard
        } else {
            self.by_topic.entry(topic.to_string()).or_default()
        }
    }

    /// Matching registrations in invocation order.
    fn snapshot(&self, topic: &str) -> Vec<Arc<Registration>> {
        let exact = self.by_topic.get(topic).map(Vec::as_slice).unwrap_or(&[]);
        let mut handlers: Vec<Arc<Registration>> =
            exact.iter().chain(self.wildcard.iter()).cloned().collect();
        handlers.sort_by_key(|r| (r.priority, r.seq));
        handlers
    }
}

#[derive(Default)]
struct BusCounters {
    events_emitted: AtomicU64,
    handler_invocations: AtomicU64,
    handler_failures: AtomicU64,
}

/// In-process publish/subscribe dispatcher.
///
/// Handlers for a topic run one after another in ascending priority order,
/// equal priorities in registration order. The exact-topic bucket and the
/// wildcard bucket are merged before sorting. A handler fault is caught,
/// logged and recorded; it never stops the handlers after it.
///
/// `emit` is safe to call concurrently. Each call takes a snapshot of the
/// handler table under a short read lock, so subscriptions changed while a
/// dispatch is in flight only affect later dispatches.
pub struct EventBus {
    table: RwLock<HandlerTable>,
    next_seq: AtomicU64,
    taps: broadcast::Sender<Arc<Event>>,
    counters: BusCounters,
}

impl EventBus {
    /// Create a new event bus with the default tap buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tap_capacity(DEFAULT_TAP_CAPACITY)
    }

    /// Create a new event bus whose taps buffer `capacity` events.
    #[must_use]
    pub fn with_tap_capacity(capacity: usize) -> Self {
        let (taps, _) = broadcast::channel(capacity.max(1));
        Self {
            table: RwLock::new(HandlerTable::default()),
            next_seq: AtomicU64::new(0),
            taps,
            counters: BusCounters::default(),
        }
    }

    /// Subscribe a handler at `DEFAULT_PRIORITY`.
    ///
    /// # Errors
    ///
    /// `BusError::InvalidTopic` if the topic fails validation.
    pub fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<SubscriptionId, BusError> {
        self.subscribe_with_priority(topic, handler, DEFAULT_PRIORITY)
    }

    /// Subscribe a handler. Lower priorities run first.
    ///
    /// Every call returns a fresh id, even for a (topic, handler) pair that
    /// is already registered; the handler then runs once per registration.
    ///
    /// # Errors
    ///
    /// `BusError::InvalidTopic` if the topic fails validation.
    pub fn subscribe_with_priority(
        &self,
        topic: &str,
        handler: Arc<dyn EventHandler>,
        priority: i32,
    ) -> Result<SubscriptionId, BusError> {
        validate_topic(topic)?;

        let id = SubscriptionId::new();
        let registration = Arc::new(Registration {
            id: id.clone(),
            priority,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            handler,
        });

        debug!(
            topic,
            subscription_id = %id,
            handler = registration.handler.name(),
            priority,
            "Handler subscribed"
        );

        let mut table = self.table.write();
        table.bucket_mut(topic).push(registration);
        table.index.insert(id.clone(), topic.to_string());

        Ok(id)
    }

    /// Remove a subscription. Unknown ids are a no-op.
    ///
    /// Returns whether a subscription was removed.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let mut table = self.table.write();
        let Some(topic) = table.index.remove(id) else {
            return false;
        };

        let bucket = table.bucket_mut(&topic);
        bucket.retain(|r| &r.id != id);
        let now_empty = bucket.is_empty();
        if now_empty && topic != WILDCARD_TOPIC {
            table.by_topic.remove(&topic);
        }

        debug!(topic = %topic, subscription_id = %id, "Handler unsubscribed");
        true
    }

    /// Build an event and dispatch it.
    ///
    /// # Errors
    ///
    /// `BusError::InvalidTopic` or `BusError::WildcardEmit`. Handler faults
    /// are reported in the `DispatchResult`, never here.
    pub async fn emit(
        &self,
        topic: &str,
        payload: Payload,
        source: &str,
    ) -> Result<DispatchResult, BusError> {
        self.emit_event(Event::new(topic, payload, source)).await
    }

    /// Dispatch a pre-built event.
    ///
    /// # Errors
    ///
    /// See [`EventBus::emit`].
    pub async fn emit_event(&self, event: Event) -> Result<DispatchResult, BusError> {
        if event.topic == WILDCARD_TOPIC {
            return Err(BusError::WildcardEmit);
        }
        validate_topic(&event.topic)?;

        let event = Arc::new(event);
        let handlers = self.table.read().snapshot(&event.topic);

        self.counters.events_emitted.fetch_add(1, Ordering::Relaxed);
        debug!(
            topic = %event.topic,
            source = %event.source,
            handlers = handlers.len(),
            "Event emitted"
        );

        let mut outcomes = Vec::with_capacity(handlers.len());
        for registration in handlers {
            outcomes.push(self.invoke(&registration, &event).await);
        }

        // No receivers is fine: taps are optional.
        let _ = self.taps.send(Arc::clone(&event));

        Ok(DispatchResult { event, outcomes })
    }

    async fn invoke(&self, registration: &Registration, event: &Arc<Event>) -> HandlerOutcome {
        let handler = &registration.handler;
        let started = Instant::now();

        let result = match AssertUnwindSafe(handler.handle(Arc::clone(event)))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(HandlerError::Panicked(panic_message(panic.as_ref()))),
        };

        self.counters
            .handler_invocations
            .fetch_add(1, Ordering::Relaxed);

        if let Err(e) = &result {
            self.counters.handler_failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                topic = %event.topic,
                handler = handler.name(),
                subscription_id = %registration.id,
                error = %e,
                "Event handler failed"
            );
        }

        HandlerOutcome {
            subscription_id: registration.id.clone(),
            handler: handler.name().to_string(),
            priority: registration.priority,
            result,
            duration: started.elapsed(),
        }
    }

    /// Observe emitted events matching `pattern` (`*`, exact topic, or
    /// `prefix.*`).
    ///
    /// # Errors
    ///
    /// `BusError::InvalidPattern` for anything else.
    pub fn tap(&self, pattern: &str) -> Result<Tap, BusError> {
        let valid = pattern == WILDCARD_TOPIC
            || match pattern.strip_suffix(".*") {
                Some(prefix) => validate_topic(prefix).is_ok(),
                None => validate_topic(pattern).is_ok(),
            };
        if !valid {
            return Err(BusError::InvalidPattern(pattern.to_string()));
        }

        Ok(Tap::new(self.taps.subscribe(), pattern.to_string()))
    }

    /// Number of live subscriptions across all topics.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.table.read().index.len()
    }

    /// Whether an emit on `topic` would reach at least one handler.
    #[must_use]
    pub fn has_handlers(&self, topic: &str) -> bool {
        let table = self.table.read();
        !table.wildcard.is_empty() || table.by_topic.contains_key(topic)
    }

    /// Topics with at least one exact-topic handler, sorted.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.table.read().by_topic.keys().cloned().collect();
        topics.sort();
        topics
    }

    #[must_use]
    pub fn stats(&self) -> BusStats {
        BusStats {
            events_emitted: self.counters.events_emitted.load(Ordering::Relaxed),
            handler_invocations: self.counters.handler_invocations.load(Ordering::Relaxed),
            handler_failures: self.counters.handler_failures.load(Ordering::Relaxed),
            subscriptions: self.subscriber_count(),
            taps: self.taps.receiver_count(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
