//! # Round Execution Service
//!
//! Implements `RoundExecutionApi` on top of the domain layer. Owns one
//! session per open round and is the only place that talks to the stores.
//!
//! Storage-reaching operations validate under the session lock, mark the
//! round busy, release the lock for the store call, and apply the change
//! only once the store has acknowledged it. A second operation arriving
//! while the round is busy is rejected with `AlreadyProcessing`.

// Semantic submodules
mod api;
mod checkpoints;
mod core;
mod rounds;
mod session;

// Re-export public API
pub use self::core::RoundExecutionService;
