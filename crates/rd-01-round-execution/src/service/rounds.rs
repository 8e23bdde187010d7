//! Round lifecycle: sessions, base bracketing, incidents and completion.

use super::core::RoundExecutionService;
use super::session::InFlightGuard;
use crate::domain::{ClosingCheck, InFlightOperation, LifecycleEvent};
use crate::error::{Precondition, RoundResult};
use crate::metrics;
use crate::ports::{
    BaseControlStore, PatrolNotifier, RoundProgress, RoundStatusUpdate, RoundStore,
};
use parking_lot::Mutex;
use shared_bus::PatrolEvent;
use shared_types::{BaseControlRecord, EvidenceRef, Round, RoundId, RoundStatus, Timestamp};
use std::sync::Arc;
use tracing::{debug, info, warn};

fn validate_odometer(odometer_km: f64) -> RoundResult<()> {
    if odometer_km.is_finite() && odometer_km >= 0.0 {
        Ok(())
    } else {
        Err(Precondition::InvalidOdometer(odometer_km).into())
    }
}

impl<S, B, N> RoundExecutionService<S, B, N>
where
    S: RoundStore,
    B: BaseControlStore,
    N: PatrolNotifier,
{
    pub(crate) async fn open(&self, round_id: &RoundId) -> RoundResult<RoundProgress> {
        if let Ok(existing) = self.session(round_id) {
            let progress = existing.lock().progress();
            return Ok(progress);
        }

        let loaded = self.load_session(round_id).await?;

        // A concurrent open may have landed first; keep that one.
        let (session, count) = {
            let mut sessions = self.sessions.write();
            let session = Arc::clone(
                sessions
                    .entry(round_id.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(loaded))),
            );
            (session, sessions.len())
        };
        metrics::set_open_sessions(count);

        let progress = session.lock().progress();
        info!(
            round_id = %round_id,
            status = %progress.status,
            visited = progress.visited,
            total = progress.total,
            "Round session opened"
        );
        Ok(progress)
    }

    pub(crate) async fn reload(&self, round_id: &RoundId) -> RoundResult<RoundProgress> {
        // Hold the old session busy while the store is read. The round
        // signature is only written at completion, so it rides over.
        let (guard, round_signature) = match self.session(round_id) {
            Ok(existing) => {
                let mut s = existing.lock();
                let guard =
                    InFlightGuard::acquire(&existing, &mut s, InFlightOperation::Resync)?;
                (Some(guard), s.round_signature.clone())
            }
            Err(_) => (None, None),
        };

        let mut session = self.load_session(round_id).await?;
        if session.round_signature.is_none() {
            session.round_signature = round_signature;
        }
        let progress = session.progress();
        self.install_session(session);
        drop(guard);

        info!(
            round_id = %round_id,
            visited = progress.visited,
            total = progress.total,
            "Round session resynced from store"
        );
        Ok(progress)
    }

    /// Refused while a store call is outstanding, since its result would
    /// land on a session nobody holds.
    pub(crate) fn close(&self, round_id: &RoundId) -> RoundResult<bool> {
        if let Ok(existing) = self.session(round_id) {
            existing.lock().ensure_idle()?;
        }
        let removed = self.remove_session(round_id);
        if removed {
            debug!(round_id = %round_id, "Round session closed");
        }
        Ok(removed)
    }

    pub(crate) async fn departure(
        &self,
        round_id: &RoundId,
        odometer_km: f64,
    ) -> RoundResult<BaseControlRecord> {
        validate_odometer(odometer_km)?;
        let session = self.session(round_id)?;

        let (next, start_time, guard) = {
            let mut s = session.lock();
            s.ensure_idle()?;
            let next = s.lifecycle.transition(LifecycleEvent::DepartureRecorded)?;
            let start_time = s.round.start_time.unwrap_or_else(|| self.now());
            let guard = InFlightGuard::acquire(&session, &mut s, InFlightOperation::Departure)?;
            (next, start_time, guard)
        };

        let result = self
            .write_departure(round_id, odometer_km, next.status(), start_time)
            .await;

        let record = {
            let mut s = session.lock();
            guard.release(&mut s);
            let record = result?;
            s.lifecycle = next;
            s.round.status = next.status();
            s.round.start_time = Some(start_time);
            s.departure = Some(record.clone());
            record
        };

        info!(
            round_id = %round_id,
            odometer_km = record.odometer_km,
            "Base departure recorded; round active"
        );
        self.notifier
            .notify(PatrolEvent::RoundStarted {
                round_id: round_id.clone(),
                departure: record.clone(),
            })
            .await;
        Ok(record)
    }

    /// Reuses a departure already on record, then activates the round.
    async fn write_departure(
        &self,
        round_id: &RoundId,
        odometer_km: f64,
        status: RoundStatus,
        start_time: Timestamp,
    ) -> RoundResult<BaseControlRecord> {
        let record = match self.base_control.departure(round_id).await? {
            Some(existing) => {
                debug!(round_id = %round_id, "Departure already on record; not writing again");
                existing
            }
            None => {
                self.base_control
                    .record_departure(round_id, odometer_km, start_time)
                    .await?
            }
        };

        self.round_store
            .update_round_status(RoundStatusUpdate {
                round_id: round_id.clone(),
                status,
                start_time: Some(start_time),
                end_time: None,
                signature: None,
            })
            .await?;

        Ok(record)
    }

    pub(crate) async fn arrival(
        &self,
        round_id: &RoundId,
        odometer_km: f64,
    ) -> RoundResult<BaseControlRecord> {
        validate_odometer(odometer_km)?;
        let session = self.session(round_id)?;

        let (now, guard) = {
            let mut s = session.lock();
            s.lifecycle.require_active()?;
            s.ensure_idle()?;
            if s.arrival.is_some() {
                return Err(Precondition::ArrivalAlreadyRecorded.into());
            }
            let departure_km = s
                .departure
                .as_ref()
                .map(|d| d.odometer_km)
                .ok_or(Precondition::DepartureNotRecorded)?;
            if odometer_km < departure_km {
                return Err(Precondition::OdometerBelowDeparture {
                    departure_km,
                    arrival_km: odometer_km,
                }
                .into());
            }
            let now = self.now();
            let guard = InFlightGuard::acquire(&session, &mut s, InFlightOperation::Arrival)?;
            (now, guard)
        };

        let result = self
            .base_control
            .record_arrival(round_id, odometer_km, now)
            .await;

        let record = {
            let mut s = session.lock();
            guard.release(&mut s);
            let record = result?;
            s.arrival = Some(record.clone());
            record
        };

        info!(
            round_id = %round_id,
            odometer_km = record.odometer_km,
            "Base arrival recorded"
        );
        self.notifier
            .notify(PatrolEvent::ArrivalRecorded {
                round_id: round_id.clone(),
                arrival: record.clone(),
            })
            .await;
        Ok(record)
    }

    pub(crate) fn round_signature(
        &self,
        round_id: &RoundId,
        signature: EvidenceRef,
    ) -> RoundResult<()> {
        let session = self.session(round_id)?;
        let mut s = session.lock();
        s.lifecycle.require_active()?;
        s.ensure_idle()?;
        s.round_signature = Some(signature);
        debug!(round_id = %round_id, "Round signature attached");
        Ok(())
    }

    pub(crate) async fn incident(&self, round_id: &RoundId, description: &str) -> RoundResult<()> {
        let session = self.session(round_id)?;

        let (next, now, guard) = {
            let mut s = session.lock();
            s.ensure_idle()?;
            let next = s.lifecycle.transition(LifecycleEvent::IncidentReported)?;
            let now = self.now();
            let guard = InFlightGuard::acquire(&session, &mut s, InFlightOperation::Incident)?;
            (next, now, guard)
        };

        let result = self
            .round_store
            .update_round_status(RoundStatusUpdate {
                round_id: round_id.clone(),
                status: next.status(),
                start_time: None,
                end_time: None,
                signature: None,
            })
            .await;

        {
            let mut s = session.lock();
            guard.release(&mut s);
            result?;
            s.lifecycle = next;
            s.round.status = next.status();
        }

        warn!(round_id = %round_id, description, "Incident reported");
        self.notifier
            .notify(PatrolEvent::IncidentReported {
                round_id: round_id.clone(),
                description: description.to_string(),
                reported_at: now,
            })
            .await;
        Ok(())
    }

    pub(crate) async fn complete(&self, round_id: &RoundId) -> RoundResult<Round> {
        let session = self.session(round_id)?;

        let (next, update, guard) = {
            let mut s = session.lock();
            s.ensure_idle()?;
            let next = s.lifecycle.transition(LifecycleEvent::RoundClosed)?;
            ClosingCheck {
                remaining_checkpoints: s.sequencer.remaining().len(),
                requires_signature: s.round.requires_signature,
                has_round_signature: s.round_signature.is_some(),
                require_arrival: self.config.require_arrival,
                has_arrival: s.arrival.is_some(),
            }
            .verify()?;

            let update = RoundStatusUpdate {
                round_id: round_id.clone(),
                status: next.status(),
                start_time: s.round.start_time,
                end_time: Some(self.now()),
                signature: s.round_signature.clone(),
            };
            let guard = InFlightGuard::acquire(&session, &mut s, InFlightOperation::Completion)?;
            (next, update, guard)
        };

        let result = self.round_store.update_round_status(update.clone()).await;

        let round = {
            let mut s = session.lock();
            guard.release(&mut s);
            result?;
            s.lifecycle = next;
            s.round.status = update.status;
            s.round.end_time = update.end_time;
            s.round.signature = update.signature.clone();
            s.round.clone()
        };

        let end_time = round.end_time.unwrap_or_default();
        metrics::record_round_closed(&round.status.to_string());
        info!(
            round_id = %round_id,
            status = %round.status,
            end_time,
            "Round closed"
        );
        self.notifier
            .notify(PatrolEvent::RoundClosed {
                round_id: round_id.clone(),
                status: round.status,
                end_time,
            })
            .await;
        Ok(round)
    }
}
