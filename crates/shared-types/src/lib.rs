//! # Shared Types Crate
//!
//! This crate contains the patrol domain entities and the storage error type
//! shared by the round engine, its adapters and the runtime.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Every cross-crate type is defined here.
//! - **Opaque Evidence**: Photos and signatures are references only; no blob
//!   content crosses these types.
//! - **Store-Assigned Identity**: `VisitId` values come from the store, never
//!   from the engine.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
