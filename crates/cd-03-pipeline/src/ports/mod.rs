//! Ports layer.

pub mod outbound;

pub use outbound::{stage_fn, FnStage, PipelineStage};
