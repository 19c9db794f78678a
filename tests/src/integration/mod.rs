//! Cross-component integration tests.

pub mod boundaries;
pub mod flows;
pub mod substrate;
