//! # Shared Types Crate
//!
//! This crate contains the event model, the domain vocabulary and the topic
//! namespace used by every component of the substrate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Event`, `Domain` and the topic constants are
//!   defined here and nowhere else.
//! - **Topics Are The Contract**: Domains never call each other. The only thing
//!   one domain knows about another is the name of a topic.
//! - **One Direction**: Events flow ingestion → decision → presentation.
//!   `FlowPolicy` is the executable form of that rule.

pub mod domain;
pub mod entities;
pub mod errors;
pub mod humantime_serde;
pub mod time;
pub mod topics;

pub use domain::{Domain, FlowPolicy};
pub use entities::{Event, Payload, SubscriptionId};
pub use errors::*;
pub use time::{now_millis, SystemTimeSource, TimeSource, Timestamp};
pub use topics::{topic_matches, validate_topic, WILDCARD_TOPIC};

#[cfg(any(test, feature = "test-utils"))]
pub use time::MockTimeSource;
