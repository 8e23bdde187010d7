//! # rd-01-round-execution
//!
//! Patrol round execution engine for a guard's field device.
//!
//! ## Overview
//!
//! This subsystem provides:
//! - **Identifier Matcher**: camera tags and keypad codes against the current checkpoint
//! - **Geofence Evaluator**: haversine distance check for automatic check-in
//! - **Completion Gate**: checklist, photo and signature requirements
//! - **Checkpoint Sequencer**: strict route order with resume from durable visits
//! - **Round Lifecycle**: base departure, checkpoints, arrival, close
//!
//! ## Architecture
//!
//! ```text
//! Field UI ──scan / location / evidence──→ Round Execution (1)
//!                                               │
//!                                               ├── NewVisit / RoundStatusUpdate ──→ RoundStore
//!                                               │
//!                                               ├── departure / arrival ──→ BaseControlStore
//!                                               │
//!                                               └── PatrolEvent ──→ Event Bus
//! ```
//!
//! ## Round Lifecycle
//!
//! ```text
//! [PENDING] ──departure──→ [ACTIVE] ──all visited + arrival──→ [CLOSED]
//!     │                       │
//!     └──────── incident flag (status reads Incident) ────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use rd_01_round_execution::{RoundExecutionConfig, RoundExecutionService};
//! use rd_01_round_execution::ports::RoundExecutionApi;
//!
//! let service = RoundExecutionService::with_system_time(
//!     RoundExecutionConfig::from_env(),
//!     round_store,
//!     base_control,
//!     notifier,
//! );
//!
//! service.open_round(&round_id).await?;
//! service.record_departure(&round_id, 48_210.0).await?;
//! service.submit_scan(&round_id, r#"{"type":"checkpoint","manual_code":"123456789"}"#).await?;
//! service.attach_photo(&round_id, "photo://gate".into()).await?;
//! service.finalize_checkpoint(&round_id, &"cp-1".into()).await?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use config::{ConfigError, RoundExecutionConfig};
pub use domain::{
    CheckpointAttemptState, CheckpointSequencer, GeofenceEvaluator, InFlightOperation,
    MatchOutcome, MissingRequirement, RoundLifecycle, RoundPhase, ScanToken,
};
pub use error::{Precondition, RoundError, RoundResult};
pub use service::RoundExecutionService;
