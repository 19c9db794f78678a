//! # Reference Domains
//!
//! Minimal ingestion, decision and presentation domains that exercise the
//! substrate end to end. Real adapters (chat platforms, LLM clients, TTS
//! engines, avatars) replace them.
//!
//! Each module only talks to the others through its [`DomainBus`]; none of
//! them names another domain's module. `boundary-check` verifies this on
//! every build of the workspace (see `boundary.toml`).
//!
//! [`DomainBus`]: crate::adapters::DomainBus

pub mod decision;
pub mod ingestion;
pub mod presentation;
