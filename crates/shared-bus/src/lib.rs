//! # Shared Bus - Event Bus for Inter-Domain Communication
//!
//! The only channel through which the ingestion, decision and presentation
//! domains talk to each other.
//!
//! ## Architecture Rules
//!
//! - All inter-domain communication goes through the bus
//! - **Direct calls between domains are FORBIDDEN**
//! - Events only flow ingestion → decision → presentation
//!   (see `shared_types::FlowPolicy`)
//!
//! ## Dispatch Model
//!
//! ```text
//! emit("decision.intent.generated")
//!        │
//!        ▼
//! ┌─────────────────────────────────────────────┐
//! │ exact bucket  ∪  wildcard ("*") bucket       │
//! │ sorted by (priority, registration order)     │
//! └─────────────────────────────────────────────┘
//!        │  one at a time, each isolated
//!        ▼
//!   handler(p=1) → handler(p=5) → handler(p=10)
//!        │
//!        ▼
//!   DispatchResult (per-handler outcome)  +  taps (lossy observers)
//! ```
//!
//! The bus provides ordering, not parallel fan-out: a handler runs to
//! completion before the next one starts, so "intent generated" is fully
//! handled before anything it triggers downstream.
//!
//! ## Fault Isolation
//!
//! | Fault | Effect |
//! |-------|--------|
//! | Handler returns `Err` | Logged with handler name and subscription id, recorded, next handler runs |
//! | Handler panics | Caught, recorded as `HandlerError::Panicked`, next handler runs |
//! | Invalid topic | `BusError` returned to the caller, nothing dispatched |

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod dispatch;
pub mod errors;
pub mod handler;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use dispatch::{BusStats, DispatchResult, HandlerOutcome};
pub use errors::{BusError, HandlerError, TapError};
pub use handler::{handler_fn, EventHandler, FnHandler};
pub use publisher::EventBus;
pub use subscriber::Tap;

/// Priority used by `EventBus::subscribe`.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Events buffered per tap before a slow tap starts skipping.
pub const DEFAULT_TAP_CAPACITY: usize = 1000;
