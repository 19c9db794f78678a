//! # Domain Bus Adapter
//!
//! The bus view handed to each functional domain. It wraps the shared
//! `EventBus` and enforces the domain flow before anything reaches it:
//!
//! - Publishing a topic owned by another domain is rejected
//! - Subscribing to a downstream domain's topic is rejected
//! - Subscribing to `*` is rejected
//!
//! Infrastructure topics (unknown first segment) pass through unchecked.
//! Every rejection is logged and counted in
//! `conduit_bus_flow_violations_total`.

use std::sync::Arc;

use conduit_telemetry::BUS_FLOW_VIOLATIONS;
use shared_bus::{BusError, DispatchResult, EventBus, EventHandler, DEFAULT_PRIORITY};
use shared_types::{Domain, FlowPolicy, FlowViolation, Payload, SubscriptionId};
use thiserror::Error;
use tracing::{debug, warn};

/// Event bus adapter for one domain.
#[derive(Clone)]
pub struct DomainBus {
    /// The shared bus.
    bus: Arc<EventBus>,
    /// The domain this adapter speaks for.
    domain: Domain,
}

impl DomainBus {
    /// Create an adapter for `domain`.
    pub fn new(bus: Arc<EventBus>, domain: Domain) -> Self {
        Self { bus, domain }
    }

    /// Publish an event. `component` becomes the event source, prefixed with
    /// the domain (`decision.responder`).
    ///
    /// # Errors
    ///
    /// `DomainBusError::Flow` if the topic belongs to another domain,
    /// `DomainBusError::Bus` if the bus rejects it.
    pub async fn emit(
        &self,
        topic: &str,
        payload: Payload,
        component: &str,
    ) -> Result<DispatchResult, DomainBusError> {
        FlowPolicy::check_publish(self.domain, topic).map_err(|v| self.reject(v))?;

        let source = format!("{}.{}", self.domain, component);
        Ok(self.bus.emit(topic, payload, &source).await?)
    }

    /// Subscribe at the default priority.
    ///
    /// # Errors
    ///
    /// See [`DomainBus::subscribe_with_priority`].
    pub fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<SubscriptionId, DomainBusError> {
        self.subscribe_with_priority(topic, handler, DEFAULT_PRIORITY)
    }

    /// Subscribe a handler.
    ///
    /// # Errors
    ///
    /// `DomainBusError::Flow` for a downstream or wildcard topic,
    /// `DomainBusError::Bus` for an invalid topic.
    pub fn subscribe_with_priority(
        &self,
        topic: &str,
        handler: Arc<dyn EventHandler>,
        priority: i32,
    ) -> Result<SubscriptionId, DomainBusError> {
        FlowPolicy::check_subscribe(self.domain, topic).map_err(|v| self.reject(v))?;

        debug!(domain = %self.domain, topic, handler = handler.name(), "Domain subscribing");
        Ok(self.bus.subscribe_with_priority(topic, handler, priority)?)
    }

    /// Remove a subscription made through any adapter.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// The domain this adapter speaks for.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    fn reject(&self, violation: FlowViolation) -> DomainBusError {
        warn!(domain = %self.domain, error = %violation, "Domain flow violation");
        BUS_FLOW_VIOLATIONS
            .with_label_values(&[self.domain.as_str(), violation_kind(&violation)])
            .inc();
        DomainBusError::Flow(violation)
    }
}

/// Metric label for a violation.
pub fn violation_kind(violation: &FlowViolation) -> &'static str {
    match violation {
        FlowViolation::ForeignPublish { .. } => "foreign_publish",
        FlowViolation::UpstreamConsumption { .. } => "upstream_consumption",
        FlowViolation::WildcardSubscription { .. } => "wildcard",
        FlowViolation::DirectDependency { .. } => "direct_dependency",
    }
}

/// Domain bus errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainBusError {
    /// The operation would break the domain flow.
    #[error(transparent)]
    Flow(#[from] FlowViolation),

    /// The bus rejected the operation.
    #[error(transparent)]
    Bus(#[from] BusError),
}
