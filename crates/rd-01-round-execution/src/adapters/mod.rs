//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits: in-memory stores, event-bus
//! notification and a controllable clock.

mod memory_store;
mod notifier;
mod time;

pub use memory_store::{InMemoryBaseControlStore, InMemoryRoundStore};
pub use notifier::{EventBusNotifier, RecordingNotifier};
pub use time::ManualTimeSource;
