//! Outbound Ports (Driven Ports)
//!
//! The contract a post-processing stage implements.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::StageError;

/// One step of a pipeline over artifacts of type `A`.
///
/// A stage takes ownership of the artifact and returns the (possibly
/// transformed) artifact for the next stage, or `None` to discard it. The
/// future may be cancelled at any `.await` when the stage times out.
#[async_trait]
pub trait PipelineStage<A>: Send + Sync {
    /// Unique within a pipeline; used for configuration and statistics.
    fn name(&self) -> &str;

    async fn process(&self, artifact: A) -> Result<Option<A>, StageError>;
}

/// `PipelineStage` backed by an async closure. See [`stage_fn`].
pub struct FnStage<F> {
    name: String,
    func: F,
}

#[async_trait]
impl<A, F, Fut> PipelineStage<A> for FnStage<F>
where
    A: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<A>, StageError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, artifact: A) -> Result<Option<A>, StageError> {
        (self.func)(artifact).await
    }
}

/// Wrap an async closure as a named stage.
///
/// ```ignore
/// let upper = stage_fn("uppercase", |text: String| async move { Ok(Some(text.to_uppercase())) });
/// pipeline.register(upper, StageConfig::with_priority(100))?;
/// ```
pub fn stage_fn<A, F, Fut>(name: impl Into<String>, func: F) -> Arc<dyn PipelineStage<A>>
where
    A: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<A>, StageError>> + Send + 'static,
{
    Arc::new(FnStage {
        name: name.into(),
        func,
    })
}
