//! # Store Port Adapters
//!
//! The engine only knows `RoundStore` and `BaseControlStore`. These tests put
//! hand-written adapters behind them to check what the engine writes, in
//! which order, and how it reacts when a backend refuses.

use async_trait::async_trait;
use parking_lot::RwLock;
use rd_01_round_execution::adapters::InMemoryRoundStore;
use rd_01_round_execution::ports::{NewVisit, RoundSnapshot, RoundStatusUpdate, RoundStore};
use shared_types::{RoundId, StoreError, VisitId};

/// One call the engine made on the store.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StoreCall {
    Load(RoundId),
    Visit(NewVisit),
    Status(RoundStatusUpdate),
}

/// Records every call, then forwards it to an in-memory store.
#[derive(Default)]
pub(crate) struct JournalingStore {
    inner: InMemoryRoundStore,
    journal: RwLock<Vec<StoreCall>>,
    /// Refuse visits for this checkpoint permanently.
    refuse_checkpoint: RwLock<Option<String>>,
}

impl JournalingStore {
    pub(crate) fn seeded(snapshot: RoundSnapshot) -> Self {
        let store = Self::default();
        store.inner.insert(snapshot);
        store
    }

    pub(crate) fn journal(&self) -> Vec<StoreCall> {
        self.journal.read().clone()
    }

    pub(crate) fn refuse_visits_for(&self, checkpoint_id: &str) {
        *self.refuse_checkpoint.write() = Some(checkpoint_id.to_string());
    }

    pub(crate) fn inner(&self) -> &InMemoryRoundStore {
        &self.inner
    }
}

#[async_trait]
impl RoundStore for JournalingStore {
    async fn load_round(&self, round_id: &RoundId) -> Result<RoundSnapshot, StoreError> {
        self.journal.write().push(StoreCall::Load(round_id.clone()));
        self.inner.load_round(round_id).await
    }

    async fn record_visit(&self, visit: NewVisit) -> Result<VisitId, StoreError> {
        self.journal.write().push(StoreCall::Visit(visit.clone()));
        let refused = self.refuse_checkpoint.read().clone();
        if refused.as_deref() == Some(visit.checkpoint_id.as_str()) {
            return Err(StoreError::Rejected(format!(
                "checkpoint {} archived",
                visit.checkpoint_id
            )));
        }
        self.inner.record_visit(visit).await
    }

    async fn update_round_status(&self, update: RoundStatusUpdate) -> Result<(), StoreError> {
        self.journal.write().push(StoreCall::Status(update.clone()));
        self.inner.update_round_status(update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::bus_flows::{route_snapshot, START};
    use rd_01_round_execution::adapters::{
        InMemoryBaseControlStore, ManualTimeSource, RecordingNotifier,
    };
    use rd_01_round_execution::ports::{BaseControlStore, RoundExecutionApi};
    use rd_01_round_execution::{RoundError, RoundExecutionConfig, RoundExecutionService};
    use shared_types::{BaseControlKind, BaseControlRecord, CheckInMethod, RoundStatus};
    use std::sync::Arc;

    type JournalEngine =
        RoundExecutionService<JournalingStore, InMemoryBaseControlStore, RecordingNotifier>;

    struct Setup {
        engine: JournalEngine,
        store: Arc<JournalingStore>,
        base: Arc<InMemoryBaseControlStore>,
        clock: Arc<ManualTimeSource>,
        round_id: RoundId,
    }

    fn setup() -> Setup {
        let round_id: RoundId = "round-j".into();
        let store = Arc::new(JournalingStore::seeded(route_snapshot("round-j")));
        let base = Arc::new(InMemoryBaseControlStore::new());
        let clock = Arc::new(ManualTimeSource::new(START));
        let engine = RoundExecutionService::new(
            RoundExecutionConfig::default(),
            Arc::clone(&store),
            Arc::clone(&base),
            Arc::new(RecordingNotifier::new()),
            clock.clone(),
        );
        Setup {
            engine,
            store,
            base,
            clock,
            round_id,
        }
    }

    // =============================================================================
    // WRITE ORDER
    // =============================================================================

    #[tokio::test]
    async fn test_engine_writes_in_lifecycle_order() {
        // Setup
        let s = setup();
        let id = &s.round_id;

        // Act
        s.engine.open_round(id).await.unwrap();
        s.engine.record_departure(id, 500.0).await.unwrap();
        s.clock.advance(1_000);
        s.engine.submit_scan(id, "123456789").await.unwrap();
        s.engine.attach_photo(id, "photo://gate".into()).await.unwrap();
        s.clock.advance(4_000);
        s.engine
            .finalize_checkpoint(id, &"cp-gate".into())
            .await
            .unwrap();

        // Assert
        let journal = s.store.journal();
        assert_eq!(journal.len(), 3);
        assert_eq!(journal[0], StoreCall::Load(id.clone()));
        match &journal[1] {
            StoreCall::Status(update) => {
                assert_eq!(update.status, RoundStatus::Active);
                assert_eq!(update.start_time, Some(START));
                assert_eq!(update.end_time, None);
            }
            other => panic!("Expected status write, got {:?}", other),
        }
        match &journal[2] {
            StoreCall::Visit(visit) => {
                assert_eq!(visit.checkpoint_id.as_str(), "cp-gate");
                assert_eq!(visit.visited_at, START + 5_000);
                assert_eq!(visit.duration_ms, 4_000);
                assert_eq!(visit.check_in, CheckInMethod::ManualCode);
                assert!(visit.photo.is_some());
            }
            other => panic!("Expected visit write, got {:?}", other),
        }
    }

    /// Departure already on file from another device.
    #[tokio::test]
    async fn test_departure_on_file_activates_round_at_open() {
        // Setup
        let s = setup();
        s.base.insert(BaseControlRecord {
            round_id: s.round_id.clone(),
            kind: BaseControlKind::Departure,
            odometer_km: 480.0,
            recorded_at: START - 60_000,
        });

        // Act
        let progress = s.engine.open_round(&s.round_id).await.unwrap();

        // Assert: a departure on file activates the round at load
        assert!(progress.has_departure);
        assert_eq!(progress.status, RoundStatus::Active);
        let departure = s.base.departure(&s.round_id).await.unwrap().unwrap();
        assert_eq!(departure.odometer_km, 480.0);
    }

    // =============================================================================
    // REFUSALS
    // =============================================================================

    #[tokio::test]
    async fn test_refused_visit_leaves_round_at_checkpoint() {
        // Setup
        let s = setup();
        let id = &s.round_id;
        s.engine.open_round(id).await.unwrap();
        s.engine.record_departure(id, 500.0).await.unwrap();
        s.engine.submit_scan(id, "123456789").await.unwrap();
        s.engine.attach_photo(id, "photo://gate".into()).await.unwrap();
        s.store.refuse_visits_for("cp-gate");

        // Act
        let first = s.engine.finalize_checkpoint(id, &"cp-gate".into()).await;
        let second = s.engine.finalize_checkpoint(id, &"cp-gate".into()).await;

        // Assert
        for result in [first, second] {
            match result {
                Err(RoundError::PersistenceFailure(StoreError::Rejected(reason))) => {
                    assert!(reason.contains("archived"));
                }
                other => panic!("Expected PersistenceFailure, got {:?}", other),
            }
        }
        let progress = s.engine.progress(id).unwrap();
        assert_eq!(progress.visited, 0);
        assert_eq!(progress.current_checkpoint.as_ref().map(|c| c.as_str()), Some("cp-gate"));
        assert!(s.store.inner().visits(id).is_empty());

        // Evidence survives the refusal
        let attempt = s.engine.current_attempt(id).unwrap().unwrap();
        assert!(attempt.can_finalize());
    }

    #[tokio::test]
    async fn test_completion_write_carries_end_time() {
        // Setup
        let s = setup();
        let id = &s.round_id;
        s.engine.open_round(id).await.unwrap();
        s.engine.record_departure(id, 500.0).await.unwrap();
        for (code, cp) in [("123456789", "cp-gate"), ("222222222", "cp-dock")] {
            s.engine.submit_scan(id, code).await.unwrap();
            if cp == "cp-dock" {
                s.engine.set_checklist_item(id, "item-0", true).await.unwrap();
            }
            s.engine
                .attach_photo(id, format!("photo://{cp}").as_str().into())
                .await
                .unwrap();
            s.engine.finalize_checkpoint(id, &cp.into()).await.unwrap();
        }
        s.engine.record_arrival(id, 510.0).await.unwrap();
        s.clock.advance(90_000);

        // Act
        s.engine.complete_round(id).await.unwrap();

        // Assert
        let last = s.store.journal().pop().unwrap();
        match last {
            StoreCall::Status(update) => {
                assert_eq!(update.status, RoundStatus::Completed);
                assert_eq!(update.start_time, Some(START));
                assert_eq!(update.end_time, Some(START + 90_000));
            }
            other => panic!("Expected status write, got {:?}", other),
        }
        let stored = s.store.inner().round(id).unwrap();
        assert_eq!(stored.status, RoundStatus::Completed);
    }
}
