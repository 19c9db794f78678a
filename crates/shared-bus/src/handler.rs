//! # Event Handlers
//!
//! The contract a component implements to receive events, and a closure
//! adapter for the common case.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use shared_types::Event;

use crate::errors::HandlerError;

/// Receives events for the topics it was subscribed to.
///
/// Handlers run one at a time in priority order, so a handler that needs to
/// wait on I/O should `.await` rather than block the thread.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Identity used in logs and in `DispatchResult`.
    fn name(&self) -> &str;

    /// Handle one event.
    async fn handle(&self, event: Arc<Event>) -> Result<(), HandlerError>;
}

/// `EventHandler` backed by an async closure. See [`handler_fn`].
pub struct FnHandler<F> {
    name: String,
    func: F,
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: Arc<Event>) -> Result<(), HandlerError> {
        (self.func)(event).await
    }
}

/// Wrap an async closure as a named handler.
///
/// ```ignore
/// let handler = handler_fn("logger", |event| async move {
///     tracing::info!(topic = %event.topic, "seen");
///     Ok(())
/// });
/// bus.subscribe("*", handler)?;
/// ```
pub fn handler_fn<F, Fut>(name: impl Into<String>, func: F) -> Arc<dyn EventHandler>
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler {
        name: name.into(),
        func,
    })
}
