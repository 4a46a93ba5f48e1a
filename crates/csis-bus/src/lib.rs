//! # CSIS Bus - Application Event Bus
//!
//! Carries indications from CSIS service instances to the owning application:
//! lock transitions, lease expiry and client configuration changes.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ CSIS service │                    │ Application  │
//! │  instance(s) │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Publishing never blocks and never fails: with no subscriber the event is
//! dropped and logged.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{CsisEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
