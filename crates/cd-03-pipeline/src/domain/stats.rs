//! Per-stage and pipeline-wide counters.

use std::time::Duration;

use serde::Serialize;

use super::errors::StageError;

/// Counters for one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageStats {
    /// Invocations, whatever their outcome.
    pub processed: u64,
    /// Artifacts this stage discarded, by returning `None` or failing under
    /// `ErrorHandling::Drop`.
    pub dropped: u64,
    /// Failed invocations, timeouts and panics included.
    pub errors: u64,
    pub timeouts: u64,
    #[serde(skip)]
    pub total_duration: Duration,
}

impl StageStats {
    pub fn average_duration(&self) -> Duration {
        if self.processed == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_duration.as_nanos() / u128::from(self.processed);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    pub fn record_run(&mut self, elapsed: Duration) {
        self.processed += 1;
        self.total_duration += elapsed;
    }

    pub fn record_error(&mut self, error: &StageError) {
        self.errors += 1;
        if error.is_timeout() {
            self.timeouts += 1;
        }
    }

    pub fn record_drop(&mut self) {
        self.dropped += 1;
    }
}

/// Outcome counts over all `process()` calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub runs: u64,
    pub completed: u64,
    pub dropped: u64,
    pub aborted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_duration() {
        let mut stats = StageStats::default();
        assert_eq!(stats.average_duration(), Duration::ZERO);

        stats.record_run(Duration::from_millis(10));
        stats.record_run(Duration::from_millis(30));
        assert_eq!(stats.average_duration(), Duration::from_millis(20));
    }

    #[test]
    fn test_timeouts_count_as_errors() {
        let mut stats = StageStats::default();
        stats.record_error(&StageError::Timeout(Duration::from_millis(10)));
        stats.record_error(&StageError::failed("bad input"));
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.timeouts, 1);
    }
}
