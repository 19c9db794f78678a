//! # Conduit Runtime Library
//!
//! This library exposes the internal modules of the runtime for testing.
//! The main entry point is the `main.rs` binary.
//!
//! ## Architectural Patterns
//!
//! - **Event-Driven**: domains communicate via the event bus only
//! - **Unidirectional flow**: ingestion → decision → presentation, enforced
//!   at runtime by [`adapters::DomainBus`] and statically by `boundary-check`
//! - **Hexagonal**: substrate crates expose ports, the runtime wires adapters
//!
//! ## Modules
//!
//! - `container/` - Configuration and the substrate container
//! - `adapters/` - Per-domain bus adapter
//! - `domains/` - Reference ingestion, decision and presentation domains
//! - `reporter` - Periodic copy of component counters into Prometheus
//! - `runtime` - Startup and graceful shutdown

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod container;
pub mod domains;
pub mod reporter;
pub mod runtime;

pub use container::{ConfigError, RuntimeConfig, SubstrateContainer};
pub use runtime::{ConduitRuntime, RuntimeError};
