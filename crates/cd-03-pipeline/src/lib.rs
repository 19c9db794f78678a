//! # CD-03 Pipeline
//!
//! An ordered chain of post-processing stages applied to a single artifact
//! (a generated reply, a rendered intent) before it is handed downstream
//! over the event bus.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `StageConfig`, `StageRegistry` (deferred
//!   ordering), `ProcessState`, statistics
//! - **Ports Layer** (`ports/`): `PipelineStage` (driven port), `stage_fn`
//! - **Service Layer** (`service.rs`): `PipelineManager`
//!
//! ## Failure Handling
//!
//! | Stage outcome | `Continue` | `Drop` | `Stop` |
//! |---------------|------------|--------|--------|
//! | `Ok(Some(a))` | next stage gets `a` | same | same |
//! | `Ok(None)` | `process` returns `None` | same | same |
//! | error / timeout / panic | next stage gets the pre-stage artifact | `process` returns `None` | `PipelineError::StageFailed` |
//!
//! A timed-out stage future is dropped, so the stage is cancelled at its
//! current `.await` rather than left running in the background.
//!
//! ## Usage Example
//!
//! ```ignore
//! let pipeline: PipelineManager<String> = PipelineManager::new();
//! pipeline.register(stage_fn("uppercase", |t: String| async move { Ok(Some(t.to_uppercase())) }),
//!                   StageConfig::with_priority(100))?;
//! pipeline.register(profanity_filter, StageConfig::with_priority(50).error_handling(ErrorHandling::Drop))?;
//!
//! if let Some(reply) = pipeline.process(reply).await? {
//!     bus.emit(DECISION_INTENT_GENERATED, json!({ "text": reply }), "decision.pipeline").await?;
//! }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    ErrorHandling, PipelineConfig, PipelineError, PipelineStats, ProcessState, StageConfig,
    StageError, StageStats, DEFAULT_STAGE_PRIORITY, DEFAULT_STAGE_TIMEOUT_SECS,
};
pub use ports::{stage_fn, PipelineStage};
pub use service::{PipelineManager, ProcessReport};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    proptest! {
        /// Stages run in ascending priority, ties in registration order,
        /// however they were registered.
        #[test]
        fn prop_execution_order(priorities in proptest::collection::vec(0i32..5, 1..12)) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
            rt.block_on(async {
                let pipeline: PipelineManager<Vec<usize>> = PipelineManager::new();
                for (index, priority) in priorities.iter().enumerate() {
                    let stage: Arc<dyn PipelineStage<Vec<usize>>> =
                        stage_fn(format!("s{index}"), move |mut trail: Vec<usize>| async move {
                            trail.push(index);
                            Ok::<_, StageError>(Some(trail))
                        });
                    pipeline.register(stage, StageConfig::with_priority(*priority)).unwrap();
                }

                let trail = pipeline.process(Vec::new()).await.unwrap().unwrap();
                let mut expected: Vec<usize> = (0..priorities.len()).collect();
                expected.sort_by_key(|&i| (priorities[i], i));
                prop_assert_eq!(trail, expected);
                Ok(())
            })?;
        }
    }
}
