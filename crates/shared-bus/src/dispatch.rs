//! # Dispatch Results
//!
//! What one `emit` did: which handlers ran, in which order, and how each
//! one fared.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use shared_types::{Event, SubscriptionId};

use crate::errors::HandlerError;

/// Outcome of one handler invocation.
#[derive(Debug, Clone)]
pub struct HandlerOutcome {
    pub subscription_id: SubscriptionId,
    /// `EventHandler::name` of the invoked handler.
    pub handler: String,
    pub priority: i32,
    pub result: Result<(), HandlerError>,
    pub duration: Duration,
}

impl HandlerOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-handler record of a single `emit`.
///
/// `outcomes` is in invocation order: ascending priority, then registration
/// order.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub event: Arc<Event>,
    pub outcomes: Vec<HandlerOutcome>,
}

impl DispatchResult {
    /// Number of handlers invoked.
    pub fn handler_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    /// True when every handler succeeded (vacuously true with no handlers).
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(HandlerOutcome::is_success)
    }

    /// Failed invocations only.
    pub fn failures(&self) -> impl Iterator<Item = &HandlerOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Handler names in invocation order.
    pub fn handler_names(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.handler.as_str()).collect()
    }
}

/// Snapshot of bus counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    pub events_emitted: u64,
    pub handler_invocations: u64,
    pub handler_failures: u64,
    /// Live subscriptions at snapshot time.
    pub subscriptions: usize,
    /// Live taps at snapshot time.
    pub taps: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(name: &str, result: Result<(), HandlerError>) -> HandlerOutcome {
        HandlerOutcome {
            subscription_id: SubscriptionId::new(),
            handler: name.to_string(),
            priority: 100,
            result,
            duration: Duration::from_micros(5),
        }
    }

    #[test]
    fn test_dispatch_result_counts() {
        let result = DispatchResult {
            event: Arc::new(Event::new("system.test", json!(null), "test")),
            outcomes: vec![
                outcome("a", Ok(())),
                outcome("b", Err(HandlerError::failed("boom"))),
                outcome("c", Ok(())),
            ],
        };

        assert_eq!(result.handler_count(), 3);
        assert_eq!(result.success_count(), 2);
        assert_eq!(result.failure_count(), 1);
        assert!(!result.all_succeeded());
        assert_eq!(result.handler_names(), vec!["a", "b", "c"]);
        assert_eq!(result.failures().next().map(|o| o.handler.as_str()), Some("b"));
    }

    #[test]
    fn test_empty_dispatch_succeeds() {
        let result = DispatchResult {
            event: Arc::new(Event::new("system.test", json!(null), "test")),
            outcomes: Vec::new(),
        };
        assert!(result.all_succeeded());
        assert_eq!(result.failure_count(), 0);
    }
}
