//! # Process State Machine
//!
//! ```text
//! Running(0) ──→ Running(1) ──→ ... ──→ Complete
//!     │              │
//!     ├──────────────┴──→ Dropped          (stage returned None / Drop)
//!     └──────────────────→ Aborted(stage)  (Stop)
//! ```
//!
//! Each enabled stage is visited at most once per call; terminal states
//! never transition again.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    /// About to run, or running, the stage at this position in the plan.
    Running(usize),
    Complete,
    Dropped,
    /// Aborted by the named stage.
    Aborted(String),
}

impl ProcessState {
    pub fn start() -> Self {
        Self::Running(0)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running(_))
    }

    /// Move past the current stage. `Complete` once `total` stages ran.
    #[must_use]
    pub fn advance(self, total: usize) -> Self {
        match self {
            Self::Running(index) if index + 1 >= total => Self::Complete,
            Self::Running(index) => Self::Running(index + 1),
            terminal => terminal,
        }
    }

    #[must_use]
    pub fn drop_artifact(self) -> Self {
        match self {
            Self::Running(_) => Self::Dropped,
            terminal => terminal,
        }
    }

    #[must_use]
    pub fn abort(self, stage: &str) -> Self {
        match self {
            Self::Running(_) => Self::Aborted(stage.to_string()),
            terminal => terminal,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running(index) => write!(f, "running({index})"),
            Self::Complete => f.write_str("complete"),
            Self::Dropped => f.write_str("dropped"),
            Self::Aborted(stage) => write!(f, "aborted({stage})"),
        }
    }
}
