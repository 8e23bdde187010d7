//! # Patrol Runtime Library
//!
//! Exposes the runtime's modules for testing. The entry point is the
//! `main.rs` binary, which replays a recorded patrol through the round
//! engine.
//!
//! ## Wiring
//!
//! - **Stores**: in-memory round and base-control stores, seeded from the fixture
//! - **Events**: the engine publishes on the shared event bus; the replay reads them back
//! - **Time**: a manual clock that follows each step's device timestamp

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod fixture;
pub mod replay;

pub use config::RuntimeConfig;
pub use fixture::{Fixture, FixtureError, Step, StepAction};
pub use replay::{PatrolEngine, RejectedStep, ReplayError, ReplayReport, ReplayRuntime};
