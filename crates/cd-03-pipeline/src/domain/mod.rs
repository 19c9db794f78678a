//! Domain layer: stage configuration, ordering, state machine, statistics.

pub mod config;
pub mod errors;
pub mod registry;
pub mod state;
pub mod stats;

pub use config::{
    ErrorHandling, PipelineConfig, StageConfig, DEFAULT_STAGE_PRIORITY, DEFAULT_STAGE_TIMEOUT_SECS,
};
pub use errors::{PipelineError, StageError};
pub use registry::{StageEntry, StageRegistry};
pub use state::ProcessState;
pub use stats::{PipelineStats, StageStats};
