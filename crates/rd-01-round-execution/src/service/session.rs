//! Per-round session state and the in-flight marker.

use crate::domain::{
    CheckpointAttemptState, CheckpointSequencer, InFlightOperation, RoundLifecycle,
};
use crate::error::{Precondition, RoundError, RoundResult};
use crate::ports::{AttemptReport, RoundProgress, RoundSnapshot};
use parking_lot::Mutex;
use shared_types::{
    BaseControlRecord, Checkpoint, CheckpointId, CheckpointVisit, Coordinate, EvidenceRef, Round,
};
use std::sync::Arc;

/// In-memory state of one open round.
///
/// Lives behind a `parking_lot::Mutex` that is never held across an await.
#[derive(Debug)]
pub(crate) struct RoundSession {
    pub(crate) round: Round,
    pub(crate) lifecycle: RoundLifecycle,
    pub(crate) sequencer: CheckpointSequencer,
    /// `None` once every checkpoint is visited.
    pub(crate) attempt: Option<CheckpointAttemptState>,
    pub(crate) visits: Vec<CheckpointVisit>,
    pub(crate) departure: Option<BaseControlRecord>,
    pub(crate) arrival: Option<BaseControlRecord>,
    pub(crate) round_signature: Option<EvidenceRef>,
    pub(crate) last_location: Option<Coordinate>,
    pub(crate) in_flight: Option<InFlightOperation>,
}

impl RoundSession {
    pub(crate) fn from_snapshot(
        snapshot: RoundSnapshot,
        departure: Option<BaseControlRecord>,
        arrival: Option<BaseControlRecord>,
    ) -> RoundResult<Self> {
        let RoundSnapshot {
            mut round,
            checkpoints,
            visits,
        } = snapshot;

        if let Some(stray) = visits.iter().find(|v| v.round_id != round.id) {
            return Err(RoundError::InconsistentState {
                reason: format!(
                    "visit {} belongs to round {}, not {}",
                    stray.id, stray.round_id, round.id
                ),
            });
        }

        let sequencer = CheckpointSequencer::resume(checkpoints, &visits)?;
        let lifecycle = RoundLifecycle::from_round(&round, departure.is_some());
        let attempt = sequencer.current().map(CheckpointAttemptState::new);
        round.status = lifecycle.status();
        let round_signature = round.signature.clone();

        Ok(Self {
            round,
            lifecycle,
            sequencer,
            attempt,
            visits,
            departure,
            arrival,
            round_signature,
            last_location: None,
            in_flight: None,
        })
    }

    /// Rejects while a storage-reaching operation holds the round.
    pub(crate) fn ensure_idle(&self) -> RoundResult<()> {
        match self.in_flight {
            Some(operation) => Err(RoundError::AlreadyProcessing {
                round_id: self.round.id.clone(),
                operation,
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn current_checkpoint(&self) -> RoundResult<&Checkpoint> {
        self.sequencer
            .current()
            .ok_or_else(|| Precondition::NoCurrentCheckpoint.into())
    }

    /// The current checkpoint and its attempt.
    pub(crate) fn current(&self) -> RoundResult<(&Checkpoint, &CheckpointAttemptState)> {
        let checkpoint = self.current_checkpoint()?;
        match &self.attempt {
            Some(attempt) if attempt.checkpoint_id == checkpoint.id => Ok((checkpoint, attempt)),
            _ => Err(RoundError::InconsistentState {
                reason: format!("no attempt open for current checkpoint {}", checkpoint.id),
            }),
        }
    }

    pub(crate) fn attempt_report(&self) -> Option<AttemptReport> {
        self.current().ok().map(|(checkpoint, attempt)| AttemptReport {
            attempt: attempt.clone(),
            missing: attempt.missing(checkpoint),
        })
    }

    pub(crate) fn require_attempt_report(&self) -> RoundResult<AttemptReport> {
        let (checkpoint, attempt) = self.current()?;
        Ok(AttemptReport {
            attempt: attempt.clone(),
            missing: attempt.missing(checkpoint),
        })
    }

    /// Apply a store-acknowledged visit and open the next attempt.
    pub(crate) fn apply_visit(&mut self, visit: CheckpointVisit) -> RoundResult<Option<CheckpointId>> {
        if !self.sequencer.is_current(&visit.checkpoint_id) {
            return Err(RoundError::InconsistentState {
                reason: format!(
                    "acknowledged visit for {} but cursor is elsewhere",
                    visit.checkpoint_id
                ),
            });
        }
        let next = self.sequencer.advance()?.cloned();
        self.attempt = next.as_ref().map(CheckpointAttemptState::new);
        self.visits.push(visit);
        Ok(next.map(|cp| cp.id))
    }

    pub(crate) fn progress(&self) -> RoundProgress {
        RoundProgress {
            round_id: self.round.id.clone(),
            status: self.lifecycle.status(),
            visited: self.sequencer.current_index(),
            total: self.sequencer.len(),
            current_checkpoint: self.sequencer.current().map(|cp| cp.id.clone()),
            has_departure: self.departure.is_some(),
            has_arrival: self.arrival.is_some(),
            has_round_signature: self.round_signature.is_some(),
        }
    }

    pub(crate) fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            round: self.round.clone(),
            checkpoints: self.sequencer.checkpoints().to_vec(),
            visits: self.visits.clone(),
        }
    }
}

/// Marks a round busy for the duration of a storage call.
///
/// Dropping an armed guard (a cancelled future, an early return) clears the
/// marker, so the round stays usable. Completed calls `release` under the
/// session lock instead.
///
/// Must not be dropped while the same session lock is held.
pub(crate) struct InFlightGuard {
    session: Arc<Mutex<RoundSession>>,
    armed: bool,
}

impl InFlightGuard {
    /// Mark `locked` busy. Call as the last fallible step of a locked block.
    pub(crate) fn acquire(
        session: &Arc<Mutex<RoundSession>>,
        locked: &mut RoundSession,
        operation: InFlightOperation,
    ) -> RoundResult<Self> {
        locked.ensure_idle()?;
        locked.in_flight = Some(operation);
        Ok(Self {
            session: Arc::clone(session),
            armed: true,
        })
    }

    pub(crate) fn release(mut self, locked: &mut RoundSession) {
        locked.in_flight = None;
        self.armed = false;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.armed {
            self.session.lock().in_flight = None;
        }
    }
}
