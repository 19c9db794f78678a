//! # Pipeline Manager
//!
//! Runs an artifact through the enabled stages in priority order. Each
//! stage runs under its own timeout; its failure is handled according to
//! its `ErrorHandling` without affecting how other stages are treated.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::domain::{
    ErrorHandling, PipelineConfig, PipelineError, PipelineStats, ProcessState, StageConfig,
    StageError, StageRegistry, StageStats,
};
use crate::ports::PipelineStage;

type StageHandle<A> = Arc<dyn PipelineStage<A>>;

/// The full account of one `process()` call.
#[derive(Debug)]
pub struct ProcessReport<A> {
    pub result: Result<Option<A>, PipelineError>,
    pub final_state: ProcessState,
    /// Stages invoked, in order.
    pub visited: Vec<String>,
}

impl<A> ProcessReport<A> {
    pub fn into_result(self) -> Result<Option<A>, PipelineError> {
        self.result
    }
}

#[derive(Default)]
struct RunCounters {
    runs: AtomicU64,
    completed: AtomicU64,
    dropped: AtomicU64,
    aborted: AtomicU64,
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

/// Priority-ordered chain of stages over artifacts of type `A`.
///
/// `A: Clone` because a failing `Continue` stage hands the next stage the
/// artifact as it was before the failure.
pub struct PipelineManager<A> {
    registry: Mutex<StageRegistry<StageHandle<A>>>,
    counters: RunCounters,
}

impl<A> Default for PipelineManager<A>
where
    A: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> PipelineManager<A>
where
    A: Clone + Send + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(StageRegistry::new()),
            counters: RunCounters::default(),
        }
    }

    /// Register a stage under its own name. Ordering is settled lazily,
    /// before the next `process()`.
    ///
    /// # Errors
    ///
    /// `DuplicateStage` or `InvalidConfig`.
    pub fn register(
        &self,
        stage: Arc<dyn PipelineStage<A>>,
        config: StageConfig,
    ) -> Result<(), PipelineError> {
        let name = stage.name().to_string();
        let priority = config.priority;
        self.registry.lock().insert(&name, stage, config)?;
        debug!(stage = %name, priority, "Stage registered");
        Ok(())
    }

    /// # Errors
    ///
    /// `UnknownStage`.
    pub fn unregister(&self, name: &str) -> Result<(), PipelineError> {
        self.registry.lock().remove(name)?;
        debug!(stage = name, "Stage unregistered");
        Ok(())
    }

    /// Replace one stage's configuration.
    ///
    /// # Errors
    ///
    /// `UnknownStage` or `InvalidConfig`.
    pub fn reconfigure(&self, name: &str, config: StageConfig) -> Result<(), PipelineError> {
        self.registry.lock().reconfigure(name, config)?;
        debug!(stage = name, "Stage reconfigured");
        Ok(())
    }

    /// # Errors
    ///
    /// `UnknownStage`.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), PipelineError> {
        self.registry.lock().set_enabled(name, enabled)?;
        debug!(stage = name, enabled, "Stage toggled");
        Ok(())
    }

    /// Apply a configuration reload. Every entry is validated before any is
    /// applied. Entries for stages that are not registered are skipped.
    ///
    /// Returns the number of stages reconfigured.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for the first invalid entry; nothing is applied.
    pub fn apply_config(&self, config: &PipelineConfig) -> Result<usize, PipelineError> {
        config.validate()?;

        let mut registry = self.registry.lock();
        let mut applied = 0;
        for (name, stage_config) in &config.stages {
            if registry.get(name).is_none() {
                warn!(stage = %name, "Configuration for unregistered stage ignored");
                continue;
            }
            registry.reconfigure(name, stage_config.clone())?;
            applied += 1;
        }
        debug!(applied, "Pipeline configuration applied");
        Ok(applied)
    }

    /// Stage names in execution order, disabled stages included.
    pub fn stage_names(&self) -> Vec<String> {
        self.registry
            .lock()
            .ordered()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn stage_config(&self, name: &str) -> Option<StageConfig> {
        self.registry.lock().get(name).map(|entry| entry.config.clone())
    }

    pub fn stage_stats(&self, name: &str) -> Option<StageStats> {
        self.registry.lock().get(name).map(|entry| entry.stats)
    }

    /// Statistics for every stage, in execution order.
    pub fn all_stage_stats(&self) -> Vec<(String, StageStats)> {
        self.registry
            .lock()
            .ordered()
            .iter()
            .map(|entry| (entry.name.clone(), entry.stats))
            .collect()
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            runs: self.counters.runs.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            aborted: self.counters.aborted.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.lock().is_empty()
    }

    /// Run `artifact` through the enabled stages.
    ///
    /// Returns `Ok(None)` if a stage discarded it.
    ///
    /// # Errors
    ///
    /// `PipelineError::StageFailed` when a stage configured with
    /// `ErrorHandling::Stop` fails or times out.
    pub async fn process(&self, artifact: A) -> Result<Option<A>, PipelineError> {
        self.process_with_report(artifact).await.into_result()
    }

    /// [`PipelineManager::process`], also reporting the final state and the
    /// stages visited.
    pub async fn process_with_report(&self, artifact: A) -> ProcessReport<A> {
        let plan = self.registry.lock().plan();
        self.counters.runs.fetch_add(1, Ordering::Relaxed);

        let total = plan.len();
        let mut state = if total == 0 {
            ProcessState::Complete
        } else {
            ProcessState::start()
        };
        let mut visited = Vec::with_capacity(total);
        let mut current = artifact;

        for (name, config, stage) in plan {
            trace!(state = %state, stage = %name, "Running stage");
            visited.push(name.clone());

            // Continue needs the input back if the stage fails.
            let fallback = (config.error_handling == ErrorHandling::Continue)
                .then(|| current.clone());

            let started = Instant::now();
            let outcome = self.invoke(&stage, &config, current).await;
            let elapsed = started.elapsed();

            match outcome {
                Ok(Some(next)) => {
                    self.record(&name, |stats| stats.record_run(elapsed));
                    current = next;
                    state = state.advance(total);
                }
                Ok(None) => {
                    self.record(&name, |stats| {
                        stats.record_run(elapsed);
                        stats.record_drop();
                    });
                    debug!(stage = %name, "Stage discarded artifact");
                    return self.finish(Ok(None), state.drop_artifact(), visited);
                }
                Err(error) => {
                    self.record(&name, |stats| {
                        stats.record_run(elapsed);
                        stats.record_error(&error);
                    });
                    warn!(
                        stage = %name,
                        error = %error,
                        handling = ?config.error_handling,
                        "Stage failed"
                    );

                    match (config.error_handling, fallback) {
                        (ErrorHandling::Continue, Some(previous)) => {
                            current = previous;
                            state = state.advance(total);
                        }
                        (ErrorHandling::Stop, _) => {
                            let failure = PipelineError::StageFailed {
                                stage: name.clone(),
                                message: error.to_string(),
                                cause: error,
                            };
                            return self.finish(Err(failure), state.abort(&name), visited);
                        }
                        // Drop; Continue always carries a fallback.
                        _ => {
                            self.record(&name, StageStats::record_drop);
                            return self.finish(Ok(None), state.drop_artifact(), visited);
                        }
                    }
                }
            }
        }

        self.finish(Ok(Some(current)), state, visited)
    }

    /// Run one stage with its timeout, converting panics into errors. On
    /// timeout the stage future is dropped, cancelling it.
    async fn invoke(
        &self,
        stage: &StageHandle<A>,
        config: &StageConfig,
        artifact: A,
    ) -> Result<Option<A>, StageError> {
        let limit = config.timeout();
        let guarded = AssertUnwindSafe(stage.process(artifact)).catch_unwind();
        match tokio::time::timeout(limit, guarded).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(StageError::Panicked(panic_message(panic.as_ref()))),
            Err(_) => Err(StageError::Timeout(limit)),
        }
    }

    fn record(&self, name: &str, update: impl FnOnce(&mut StageStats)) {
        // The stage may have been unregistered while it ran.
        if let Ok(entry) = self.registry.lock().entry_mut(name) {
            update(&mut entry.stats);
        }
    }

    fn finish(
        &self,
        result: Result<Option<A>, PipelineError>,
        final_state: ProcessState,
        visited: Vec<String>,
    ) -> ProcessReport<A> {
        let counter = match &final_state {
            ProcessState::Dropped => &self.counters.dropped,
            ProcessState::Aborted(_) => &self.counters.aborted,
            _ => &self.counters.completed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        trace!(state = %final_state, stages = visited.len(), "Pipeline finished");

        ProcessReport {
            result,
            final_state,
            visited,
        }
    }
}
