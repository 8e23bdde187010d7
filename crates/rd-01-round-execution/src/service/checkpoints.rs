//! Checkpoint processing: check-in, evidence and finalization.

use super::core::RoundExecutionService;
use super::session::{InFlightGuard, RoundSession};
use crate::domain::{decode, match_token, CheckpointAttemptState, InFlightOperation, MatchOutcome};
use crate::error::{Precondition, RoundError, RoundResult};
use crate::metrics;
use crate::ports::{
    AttemptReport, BaseControlStore, FinalizeOutcome, LocationOutcome, NewVisit, PatrolNotifier,
    RoundStore, ScanOutcome,
};
use parking_lot::Mutex;
use shared_bus::PatrolEvent;
use shared_types::{CheckInMethod, CheckpointId, Coordinate, EvidenceRef, RoundId};
use std::sync::Arc;
use tracing::info;

/// A visit validated under the session lock, waiting for the store.
pub(crate) struct PendingVisit {
    request: NewVisit,
    guard: InFlightGuard,
}

impl<S, B, N> RoundExecutionService<S, B, N>
where
    S: RoundStore,
    B: BaseControlStore,
    N: PatrolNotifier,
{
    pub(crate) fn scan(&self, round_id: &RoundId, scanned: &str) -> RoundResult<ScanOutcome> {
        let session = self.session(round_id)?;
        let mut s = session.lock();
        s.lifecycle.require_active()?;
        s.ensure_idle()?;

        let (checkpoint, attempt) = s.current()?;
        let token = decode(scanned, self.config.manual_code_length);

        match match_token(&token, checkpoint) {
            MatchOutcome::Valid => {}
            MatchOutcome::Malformed => {
                return Err(RoundError::MalformedIdentifier {
                    token: scanned.trim().to_string(),
                    expected_len: self.config.manual_code_length,
                })
            }
            MatchOutcome::Mismatch => {
                return Err(match s.sequencer.find_other(&token) {
                    Some(other) => RoundError::OutOfSequence {
                        attempted: other.id.clone(),
                        expected: Some(checkpoint.id.clone()),
                    },
                    None => RoundError::IdentifierMismatch {
                        expected: checkpoint.id.clone(),
                    },
                })
            }
        }

        let method = token.check_in_method().unwrap_or(CheckInMethod::Scan);
        let already_checked_in = attempt.is_checked_in();
        let updated = attempt.with_check_in(method, self.now());
        let missing = updated.missing(checkpoint);
        let checkpoint_id = checkpoint.id.clone();
        s.attempt = Some(updated);

        if !already_checked_in {
            info!(
                round_id = %round_id,
                checkpoint_id = %checkpoint_id,
                method = ?method,
                "Checked in at checkpoint"
            );
        }

        Ok(ScanOutcome {
            checkpoint_id,
            method,
            already_checked_in,
            missing,
        })
    }

    pub(crate) async fn location(
        &self,
        round_id: &RoundId,
        point: Coordinate,
    ) -> RoundResult<LocationOutcome> {
        let session = self.session(round_id)?;

        let pending = {
            let mut s = session.lock();
            s.lifecycle.require_active()?;
            s.last_location = Some(point);

            if s.sequencer.is_complete() {
                return Ok(LocationOutcome::Idle);
            }

            let (checkpoint, attempt) = s.current()?;
            if !self.geofence.contains(&point, checkpoint) {
                return Ok(LocationOutcome::OutsideGeofence {
                    checkpoint_id: checkpoint.id.clone(),
                    distance_m: self.geofence.distance_to(&point, checkpoint),
                });
            }
            s.ensure_idle()?;

            let newly_checked_in = !attempt.is_checked_in();
            let updated = attempt.with_check_in(CheckInMethod::Geofence, self.now());
            let missing = updated.missing(checkpoint);
            let checkpoint_id = checkpoint.id.clone();
            s.attempt = Some(updated);

            if newly_checked_in {
                info!(
                    round_id = %round_id,
                    checkpoint_id = %checkpoint_id,
                    "Checked in by geofence"
                );
            }

            if !(self.config.auto_finalize_on_geofence && missing.is_empty()) {
                return Ok(LocationOutcome::CheckedIn {
                    checkpoint_id,
                    missing,
                });
            }

            self.prepare_finalize(&session, &mut s, &checkpoint_id)?
        };

        let outcome = self.commit_finalize(&session, pending).await?;
        Ok(LocationOutcome::AutoFinalized(outcome))
    }

    /// Apply `update` to the current attempt under the session lock.
    fn update_attempt<F>(&self, round_id: &RoundId, update: F) -> RoundResult<AttemptReport>
    where
        F: FnOnce(&CheckpointAttemptState) -> RoundResult<CheckpointAttemptState>,
    {
        let session = self.session(round_id)?;
        let mut s = session.lock();
        s.lifecycle.require_active()?;
        s.ensure_idle()?;

        let (checkpoint, attempt) = s.current()?;
        let updated = update(attempt)?;
        let missing = updated.missing(checkpoint);
        s.attempt = Some(updated.clone());

        Ok(AttemptReport {
            attempt: updated,
            missing,
        })
    }

    pub(crate) fn checklist_item(
        &self,
        round_id: &RoundId,
        item_id: &str,
        checked: bool,
    ) -> RoundResult<AttemptReport> {
        self.update_attempt(round_id, |attempt| {
            attempt
                .with_checklist_item(item_id, checked)
                .ok_or_else(|| Precondition::UnknownChecklistItem(item_id.to_string()).into())
        })
    }

    pub(crate) fn photo(&self, round_id: &RoundId, photo: EvidenceRef) -> RoundResult<AttemptReport> {
        self.update_attempt(round_id, |attempt| Ok(attempt.with_photo(photo)))
    }

    pub(crate) fn signature(
        &self,
        round_id: &RoundId,
        signature: EvidenceRef,
    ) -> RoundResult<AttemptReport> {
        self.update_attempt(round_id, |attempt| Ok(attempt.with_signature(signature)))
    }

    pub(crate) fn cancel(&self, round_id: &RoundId) -> RoundResult<AttemptReport> {
        let session = self.session(round_id)?;
        let mut s = session.lock();
        s.lifecycle.require_active()?;
        s.ensure_idle()?;

        let checkpoint = s.current_checkpoint()?;
        let fresh = CheckpointAttemptState::new(checkpoint);
        let missing = fresh.missing(checkpoint);
        info!(round_id = %round_id, checkpoint_id = %checkpoint.id, "Checkpoint attempt cancelled");
        s.attempt = Some(fresh.clone());

        Ok(AttemptReport {
            attempt: fresh,
            missing,
        })
    }

    pub(crate) async fn finalize(
        &self,
        round_id: &RoundId,
        checkpoint_id: &CheckpointId,
    ) -> RoundResult<FinalizeOutcome> {
        let session = self.session(round_id)?;
        let pending = {
            let mut s = session.lock();
            self.prepare_finalize(&session, &mut s, checkpoint_id)?
        };
        self.commit_finalize(&session, pending).await
    }

    /// Validate a finalization and mark the round busy.
    fn prepare_finalize(
        &self,
        session: &Arc<Mutex<RoundSession>>,
        s: &mut RoundSession,
        checkpoint_id: &CheckpointId,
    ) -> RoundResult<PendingVisit> {
        s.lifecycle.require_active()?;
        s.ensure_idle()?;

        if !s.sequencer.is_current(checkpoint_id) {
            return Err(RoundError::OutOfSequence {
                attempted: checkpoint_id.clone(),
                expected: s.sequencer.current().map(|cp| cp.id.clone()),
            });
        }

        let (checkpoint, attempt) = s.current()?;
        let missing = attempt.missing(checkpoint);
        if !missing.is_empty() {
            return Err(RoundError::IncompleteRequirements {
                checkpoint_id: checkpoint.id.clone(),
                missing,
            });
        }
        let check_in = attempt.check_in.ok_or_else(|| RoundError::InconsistentState {
            reason: format!("checkpoint {} passed the gate without a check-in", checkpoint.id),
        })?;

        let now = self.now();
        let request = NewVisit {
            round_id: s.round.id.clone(),
            checkpoint_id: checkpoint.id.clone(),
            visited_at: now,
            location: s.last_location,
            signature: attempt.signature.clone(),
            photo: attempt.photo.clone(),
            duration_ms: now.saturating_sub(check_in.at),
            check_in: check_in.method,
        };

        let guard = InFlightGuard::acquire(session, s, InFlightOperation::Finalize)?;
        Ok(PendingVisit { request, guard })
    }

    /// Write the visit, then apply it. Nothing is applied unless the store
    /// acknowledged the write.
    async fn commit_finalize(
        &self,
        session: &Arc<Mutex<RoundSession>>,
        pending: PendingVisit,
    ) -> RoundResult<FinalizeOutcome> {
        let PendingVisit { request, guard } = pending;

        let result = self.round_store.record_visit(request.clone()).await;

        let outcome = {
            let mut s = session.lock();
            guard.release(&mut s);
            let visit_id = result?;
            let visit = request.into_visit(visit_id);
            let next_checkpoint = s.apply_visit(visit.clone())?;
            FinalizeOutcome {
                visit,
                next_checkpoint,
                all_visited: s.sequencer.is_complete(),
            }
        };

        metrics::record_visit_recorded();
        info!(
            round_id = %outcome.visit.round_id,
            checkpoint_id = %outcome.visit.checkpoint_id,
            visit_id = %outcome.visit.id,
            duration_ms = outcome.visit.duration_ms,
            next = ?outcome.next_checkpoint.as_ref().map(|id| id.as_str()),
            "Checkpoint visit recorded"
        );

        self.notifier
            .notify(PatrolEvent::VisitRecorded {
                visit: outcome.visit.clone(),
                next_checkpoint: outcome.next_checkpoint.clone(),
            })
            .await;

        Ok(outcome)
    }
}
