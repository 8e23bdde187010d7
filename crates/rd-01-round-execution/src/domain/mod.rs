//! Domain layer for round execution
//!
//! Pure logic: identifier matching, geofences, the completion gate, the
//! checkpoint cursor and the round lifecycle. No I/O.

pub mod attempt;
pub mod checklist;
pub mod geofence;
pub mod identifier;
pub mod lifecycle;
pub mod sequencer;

pub use attempt::{CheckIn, CheckpointAttemptState};
pub use checklist::{
    can_finalize, missing_requirements, ChecklistItem, ChecklistState, MissingRequirement,
};
pub use geofence::{distance_m, within_radius, GeofenceEvaluator, EARTH_RADIUS_M};
pub use identifier::{
    decode, match_scan, match_token, MatchOutcome, ScanToken, CHECKPOINT_TAG,
    DEFAULT_MANUAL_CODE_LENGTH,
};
pub use lifecycle::{ClosingCheck, LifecycleEvent, RoundLifecycle, RoundPhase};
pub use sequencer::CheckpointSequencer;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage-reaching operation currently holding a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InFlightOperation {
    Departure,
    Finalize,
    Arrival,
    Incident,
    Completion,
    Resync,
}

impl fmt::Display for InFlightOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Departure => "departure",
            Self::Finalize => "checkpoint finalization",
            Self::Arrival => "arrival",
            Self::Incident => "incident report",
            Self::Completion => "round completion",
            Self::Resync => "resync",
        };
        f.write_str(name)
    }
}
