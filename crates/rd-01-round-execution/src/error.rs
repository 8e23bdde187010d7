//! Error types for the round execution engine
//!
//! Every variant is a recoverable rejection. None of them poison the session;
//! the caller re-prompts the guard or takes an alternate path.

use crate::domain::{InFlightOperation, MissingRequirement};
use shared_types::{CheckpointId, RoundId, StoreError};
use std::fmt;
use thiserror::Error;

/// Round execution errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoundError {
    /// Scan token is neither a checkpoint tag nor a manual code
    #[error("Malformed identifier: {token:?} is not a checkpoint tag or a {expected_len}-digit code")]
    MalformedIdentifier { token: String, expected_len: usize },

    /// Well-formed code that does not identify the expected checkpoint
    #[error("Identifier mismatch: scanned code does not belong to checkpoint {expected}")]
    IdentifierMismatch { expected: CheckpointId },

    /// Action targets a checkpoint other than the current one
    #[error("Out of sequence: checkpoint {attempted} is not current (expected {}); follow checkpoint order", display_expected(.expected))]
    OutOfSequence {
        attempted: CheckpointId,
        expected: Option<CheckpointId>,
    },

    /// Completion gate is closed
    #[error("Incomplete requirements for checkpoint {checkpoint_id}: missing {}", display_missing(.missing))]
    IncompleteRequirements {
        checkpoint_id: CheckpointId,
        missing: Vec<MissingRequirement>,
    },

    /// Store rejected or failed the write; nothing was applied
    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    /// Transition blocked by round state
    #[error("Precondition violation: {0}")]
    PreconditionViolation(Precondition),

    /// Another storage-reaching operation on this round is in flight
    #[error("Round {round_id}: {operation} already being processed")]
    AlreadyProcessing {
        round_id: RoundId,
        operation: InFlightOperation,
    },

    /// No session has been opened for this round
    #[error("Round not open: {0}")]
    RoundNotOpen(RoundId),

    /// Store content violates the visit-prefix invariant
    #[error("Inconsistent round state: {reason}")]
    InconsistentState { reason: String },
}

impl RoundError {
    /// Whether repeating the same call can succeed without a different input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RoundError::PersistenceFailure(_) | RoundError::AlreadyProcessing { .. }
        )
    }

    /// Short prompt category for the field UI.
    pub fn user_hint(&self) -> &'static str {
        match self {
            RoundError::MalformedIdentifier { .. } => "scan again or type the manual code",
            RoundError::IdentifierMismatch { .. } => "wrong checkpoint code; scan the expected checkpoint",
            RoundError::OutOfSequence { .. } => "follow checkpoint order",
            RoundError::IncompleteRequirements { .. } => "complete the missing items",
            RoundError::PersistenceFailure(_) => "could not save; retry",
            RoundError::PreconditionViolation(_) => "action not available yet",
            RoundError::AlreadyProcessing { .. } => "checkpoint already being processed; wait",
            RoundError::RoundNotOpen(_) => "open the round first",
            RoundError::InconsistentState { .. } => "reload the round",
        }
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RoundError::MalformedIdentifier { .. } => "malformed_identifier",
            RoundError::IdentifierMismatch { .. } => "identifier_mismatch",
            RoundError::OutOfSequence { .. } => "out_of_sequence",
            RoundError::IncompleteRequirements { .. } => "incomplete_requirements",
            RoundError::PersistenceFailure(_) => "persistence_failure",
            RoundError::PreconditionViolation(_) => "precondition_violation",
            RoundError::AlreadyProcessing { .. } => "already_processing",
            RoundError::RoundNotOpen(_) => "round_not_open",
            RoundError::InconsistentState { .. } => "inconsistent_state",
        }
    }
}

/// Why a lifecycle transition or event was refused
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    /// Checkpoint processing needs a recorded base departure
    DepartureNotRecorded,
    DepartureAlreadyRecorded,
    ArrivalNotRecorded,
    ArrivalAlreadyRecorded,
    /// Round is completed (or closed with incident)
    RoundClosed,
    /// Every checkpoint has been visited
    NoCurrentCheckpoint,
    CheckpointsRemaining { remaining: usize },
    RoundSignatureMissing,
    UnknownChecklistItem(String),
    InvalidOdometer(f64),
    OdometerBelowDeparture { departure_km: f64, arrival_km: f64 },
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepartureNotRecorded => write!(f, "base departure not recorded"),
            Self::DepartureAlreadyRecorded => write!(f, "base departure already recorded"),
            Self::ArrivalNotRecorded => write!(f, "base arrival not recorded"),
            Self::ArrivalAlreadyRecorded => write!(f, "base arrival already recorded"),
            Self::RoundClosed => write!(f, "round is closed"),
            Self::NoCurrentCheckpoint => write!(f, "all checkpoints already visited"),
            Self::CheckpointsRemaining { remaining } => {
                write!(f, "{} checkpoint(s) not yet visited", remaining)
            }
            Self::RoundSignatureMissing => write!(f, "round signature required"),
            Self::UnknownChecklistItem(id) => write!(f, "unknown checklist item {}", id),
            Self::InvalidOdometer(km) => write!(f, "invalid odometer reading {}", km),
            Self::OdometerBelowDeparture {
                departure_km,
                arrival_km,
            } => write!(
                f,
                "arrival odometer {} below departure odometer {}",
                arrival_km, departure_km
            ),
        }
    }
}

impl From<Precondition> for RoundError {
    fn from(p: Precondition) -> Self {
        RoundError::PreconditionViolation(p)
    }
}

fn display_expected(expected: &Option<CheckpointId>) -> String {
    match expected {
        Some(id) => id.to_string(),
        None => "none".to_string(),
    }
}

fn display_missing(missing: &[MissingRequirement]) -> String {
    missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for round execution operations
pub type RoundResult<T> = Result<T, RoundError>;
