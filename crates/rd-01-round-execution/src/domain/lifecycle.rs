//! Round lifecycle state machine
//!
//! ```text
//! [PENDING] ──departure recorded──→ [ACTIVE] ──round closed──→ [CLOSED]
//!
//! incident reported: sets a flag in any phase before CLOSED
//! ```
//!
//! The incident flag is orthogonal to the phase. The persisted status is
//! derived: `Incident` while flagged, otherwise from the phase.

use crate::error::{Precondition, RoundResult};
use serde::{Deserialize, Serialize};
use shared_types::{Round, RoundStatus};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Waiting for the base departure record
    #[default]
    Pending,
    /// Checkpoints being processed
    Active,
    /// Completed; no further checkpoint work
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    DepartureRecorded,
    IncidentReported,
    RoundClosed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundLifecycle {
    phase: RoundPhase,
    incident: bool,
}

impl RoundLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct from a persisted round.
    ///
    /// An open round is active only while a departure is on record,
    /// whatever status was stored. A `Pending` round with a departure covers
    /// a status write lost after the departure was stored; an `Active` one
    /// without it goes back to waiting for departure.
    pub fn from_round(round: &Round, has_departure: bool) -> Self {
        let open_phase = if has_departure {
            RoundPhase::Active
        } else {
            RoundPhase::Pending
        };
        match round.status {
            RoundStatus::Completed => Self {
                phase: RoundPhase::Closed,
                incident: false,
            },
            RoundStatus::Incident if round.end_time.is_some() => Self {
                phase: RoundPhase::Closed,
                incident: true,
            },
            RoundStatus::Incident => Self {
                phase: open_phase,
                incident: true,
            },
            RoundStatus::Active | RoundStatus::Pending => Self {
                phase: open_phase,
                incident: false,
            },
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn has_incident(&self) -> bool {
        self.incident
    }

    pub fn is_active(&self) -> bool {
        self.phase == RoundPhase::Active
    }

    pub fn is_closed(&self) -> bool {
        self.phase == RoundPhase::Closed
    }

    /// Status as persisted.
    pub fn status(&self) -> RoundStatus {
        if self.incident {
            return RoundStatus::Incident;
        }
        match self.phase {
            RoundPhase::Pending => RoundStatus::Pending,
            RoundPhase::Active => RoundStatus::Active,
            RoundPhase::Closed => RoundStatus::Completed,
        }
    }

    /// Pure transition; `None` when the event is not allowed in this phase.
    pub fn next(&self, event: LifecycleEvent) -> Option<Self> {
        match (self.phase, event) {
            (RoundPhase::Pending, LifecycleEvent::DepartureRecorded) => Some(Self {
                phase: RoundPhase::Active,
                ..*self
            }),
            (RoundPhase::Pending | RoundPhase::Active, LifecycleEvent::IncidentReported) => {
                Some(Self {
                    incident: true,
                    ..*self
                })
            }
            (RoundPhase::Active, LifecycleEvent::RoundClosed) => Some(Self {
                phase: RoundPhase::Closed,
                ..*self
            }),
            _ => None,
        }
    }

    /// Apply `event`, or explain why it is refused.
    pub fn transition(&self, event: LifecycleEvent) -> RoundResult<Self> {
        self.next(event).ok_or_else(|| self.refusal(event).into())
    }

    fn refusal(&self, event: LifecycleEvent) -> Precondition {
        match (self.phase, event) {
            (RoundPhase::Closed, _) => Precondition::RoundClosed,
            (RoundPhase::Active, LifecycleEvent::DepartureRecorded) => {
                Precondition::DepartureAlreadyRecorded
            }
            _ => Precondition::DepartureNotRecorded,
        }
    }

    /// Checkpoint work needs an active round.
    pub fn require_active(&self) -> RoundResult<()> {
        match self.phase {
            RoundPhase::Active => Ok(()),
            RoundPhase::Pending => Err(Precondition::DepartureNotRecorded.into()),
            RoundPhase::Closed => Err(Precondition::RoundClosed.into()),
        }
    }
}

/// Preconditions for closing an active round, checked in this order.
#[derive(Debug, Clone, Copy)]
pub struct ClosingCheck {
    pub remaining_checkpoints: usize,
    pub requires_signature: bool,
    pub has_round_signature: bool,
    pub require_arrival: bool,
    pub has_arrival: bool,
}

impl ClosingCheck {
    pub fn verify(&self) -> Result<(), Precondition> {
        if self.remaining_checkpoints > 0 {
            return Err(Precondition::CheckpointsRemaining {
                remaining: self.remaining_checkpoints,
            });
        }
        if self.requires_signature && !self.has_round_signature {
            return Err(Precondition::RoundSignatureMissing);
        }
        if self.require_arrival && !self.has_arrival {
            return Err(Precondition::ArrivalNotRecorded);
        }
        Ok(())
    }
}
