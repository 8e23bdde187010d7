//! # Shared Bus - Event Bus for Patrol Events
//!
//! Carries patrol events from the round engine to whoever listens: a
//! dispatch console, a live map, the runtime's replay log.
//!
//! ## Choreography
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Round engine │                    │  Live map /  │
//! │              │    publish()       │   console    │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery
//!
//! - Events describe state the store has already acknowledged.
//! - Delivery is best-effort: a lagging subscriber skips events rather than
//!   applying backpressure to the engine.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, PatrolEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
