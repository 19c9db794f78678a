//! # Adapters
//!
//! Connect the functional domains to the shared substrate.

pub mod domain_bus;

pub use domain_bus::{violation_kind, DomainBus, DomainBusError};
