//! # Engine → Event Bus Flows
//!
//! The round engine publishes through `EventBusNotifier`; listeners only ever
//! see the bus. These tests drive the engine and assert on what subscribers
//! receive.
//!
//! ## Flows Tested
//!
//! 1. **Full round**: departure, two visits, arrival and close arrive in order
//! 2. **Topic filters**: an incident console only sees incident reports
//! 3. **Round filters**: two guards on one engine never see each other's events
//! 4. **Rejections**: refused or failed operations publish nothing

use rd_01_round_execution::adapters::{
    EventBusNotifier, InMemoryBaseControlStore, InMemoryRoundStore, ManualTimeSource,
};
use rd_01_round_execution::ports::{RoundExecutionApi, RoundSnapshot};
use rd_01_round_execution::{RoundExecutionConfig, RoundExecutionService};
use shared_bus::InMemoryEventBus;
use shared_types::{ChecklistItemTemplate, Checkpoint, Coordinate, Round, RoundId};
use std::sync::Arc;

pub(crate) type BusEngine =
    RoundExecutionService<InMemoryRoundStore, InMemoryBaseControlStore, EventBusNotifier>;

// =============================================================================
// TEST FIXTURES
// =============================================================================

pub(crate) const START: u64 = 1_700_000_000_000;

/// Two-stop route: a gate with a geofence and a dock with a required check.
pub(crate) fn route_snapshot(round_id: &str) -> RoundSnapshot {
    RoundSnapshot {
        round: Round::new(round_id),
        checkpoints: vec![
            Checkpoint::new("cp-gate", "Main gate", 1)
                .with_manual_code("123456789")
                .with_qr_code("QR-GATE")
                .with_location(Coordinate::new(-33.4489, -70.6693), 50.0),
            Checkpoint::new("cp-dock", "Loading dock", 2)
                .with_manual_code("222222222")
                .with_checklist(vec![ChecklistItemTemplate::new("Shutter locked", true)]),
        ],
        visits: Vec::new(),
    }
}

pub(crate) struct BusHarness {
    pub engine: Arc<BusEngine>,
    pub bus: Arc<InMemoryEventBus>,
    pub store: Arc<InMemoryRoundStore>,
    pub clock: Arc<ManualTimeSource>,
}

impl BusHarness {
    pub(crate) fn new(rounds: &[&str]) -> Self {
        let store = Arc::new(InMemoryRoundStore::new());
        for round_id in rounds {
            store.insert(route_snapshot(round_id));
        }
        let bus = Arc::new(InMemoryEventBus::new());
        let clock = Arc::new(ManualTimeSource::new(START));
        let engine = Arc::new(RoundExecutionService::new(
            RoundExecutionConfig::default(),
            Arc::clone(&store),
            Arc::new(InMemoryBaseControlStore::new()),
            Arc::new(EventBusNotifier::new(Arc::clone(&bus))),
            clock.clone(),
        ));
        Self {
            engine,
            bus,
            store,
            clock,
        }
    }
}

/// Walk a round from departure to close.
pub(crate) async fn patrol_full_round(engine: &BusEngine, round_id: &RoundId) {
    engine.open_round(round_id).await.unwrap();
    engine.record_departure(round_id, 1_000.0).await.unwrap();

    engine.submit_scan(round_id, "123456789").await.unwrap();
    engine
        .attach_photo(round_id, "photo://gate".into())
        .await
        .unwrap();
    engine
        .finalize_checkpoint(round_id, &"cp-gate".into())
        .await
        .unwrap();

    engine.submit_scan(round_id, "222222222").await.unwrap();
    engine
        .set_checklist_item(round_id, "item-0", true)
        .await
        .unwrap();
    engine
        .attach_photo(round_id, "photo://dock".into())
        .await
        .unwrap();
    engine
        .finalize_checkpoint(round_id, &"cp-dock".into())
        .await
        .unwrap();

    engine.record_arrival(round_id, 1_012.0).await.unwrap();
    engine.complete_round(round_id).await.unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{EventFilter, EventTopic, PatrolEvent};
    use shared_types::{RoundStatus, StoreError};
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    // =============================================================================
    // FULL ROUND
    // =============================================================================

    /// Every acknowledged change reaches a stream subscriber, in order.
    #[tokio::test]
    async fn test_full_round_events_in_order() {
        // Setup
        let harness = BusHarness::new(&["round-a"]);
        let stream = harness.bus.event_stream(EventFilter::all());
        let round_id: RoundId = "round-a".into();

        // Act
        patrol_full_round(&harness.engine, &round_id).await;
        let events: Vec<PatrolEvent> = timeout(Duration::from_secs(1), stream.take(5).collect())
            .await
            .expect("five events within timeout");

        // Assert
        assert!(matches!(events[0], PatrolEvent::RoundStarted { .. }));
        match &events[1] {
            PatrolEvent::VisitRecorded {
                visit,
                next_checkpoint,
            } => {
                assert_eq!(visit.checkpoint_id.as_str(), "cp-gate");
                assert_eq!(next_checkpoint.as_ref().map(|c| c.as_str()), Some("cp-dock"));
            }
            other => panic!("Expected VisitRecorded, got {:?}", other),
        }
        match &events[2] {
            PatrolEvent::VisitRecorded {
                visit,
                next_checkpoint,
            } => {
                assert_eq!(visit.checkpoint_id.as_str(), "cp-dock");
                assert!(next_checkpoint.is_none());
            }
            other => panic!("Expected VisitRecorded, got {:?}", other),
        }
        assert!(matches!(events[3], PatrolEvent::ArrivalRecorded { .. }));
        assert!(matches!(
            events[4],
            PatrolEvent::RoundClosed {
                status: RoundStatus::Completed,
                ..
            }
        ));
    }

    // =============================================================================
    // FILTERS
    // =============================================================================

    #[tokio::test]
    async fn test_incident_console_only_sees_incidents() {
        // Setup
        let harness = BusHarness::new(&["round-a"]);
        let mut console = harness
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Incidents]));
        let round_id: RoundId = "round-a".into();

        // Act
        harness.engine.open_round(&round_id).await.unwrap();
        harness
            .engine
            .record_departure(&round_id, 1_000.0)
            .await
            .unwrap();
        harness.clock.advance(60_000);
        harness
            .engine
            .report_incident(&round_id, "Fence cut near the dock")
            .await
            .unwrap();

        // Assert
        let received = timeout(Duration::from_secs(1), console.recv())
            .await
            .expect("incident within timeout")
            .expect("bus still open");
        match received {
            PatrolEvent::IncidentReported {
                description,
                reported_at,
                ..
            } => {
                assert_eq!(description, "Fence cut near the dock");
                assert_eq!(reported_at, START + 60_000);
            }
            other => panic!("Expected IncidentReported, got {:?}", other),
        }
        assert!(console.try_recv().unwrap().is_none());
    }

    /// Two guards patrol at once; a per-round listener sees only its own.
    #[tokio::test]
    async fn test_round_filter_isolates_concurrent_rounds() {
        // Setup
        let harness = BusHarness::new(&["round-a", "round-b"]);
        let mut only_a = harness
            .bus
            .subscribe(EventFilter::for_rounds(vec!["round-a".into()]));
        let round_a: RoundId = "round-a".into();
        let round_b: RoundId = "round-b".into();

        // Act
        tokio::join!(
            patrol_full_round(&harness.engine, &round_a),
            patrol_full_round(&harness.engine, &round_b),
        );

        // Assert
        let events = only_a.drain();
        assert_eq!(events.len(), 5);
        assert!(events.iter().all(|e| e.round_id() == &round_a));
        assert_eq!(harness.store.visits(&round_b).len(), 2);
        assert_eq!(harness.bus.subscriber_count(), 1);
    }

    // =============================================================================
    // REJECTIONS
    // =============================================================================

    #[tokio::test]
    async fn test_rejected_finalize_publishes_nothing() {
        // Setup
        let harness = BusHarness::new(&["round-a"]);
        let round_id: RoundId = "round-a".into();
        harness.engine.open_round(&round_id).await.unwrap();
        harness
            .engine
            .record_departure(&round_id, 1_000.0)
            .await
            .unwrap();
        let mut visits = harness
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Visits]));

        // Act: checked in, but no photo
        harness
            .engine
            .submit_scan(&round_id, "123456789")
            .await
            .unwrap();
        let result = harness
            .engine
            .finalize_checkpoint(&round_id, &"cp-gate".into())
            .await;

        // Assert
        assert!(result.is_err());
        assert!(visits.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_write_publishes_only_after_retry() {
        // Setup
        let harness = BusHarness::new(&["round-a"]);
        let round_id: RoundId = "round-a".into();
        harness.engine.open_round(&round_id).await.unwrap();
        harness
            .engine
            .record_departure(&round_id, 1_000.0)
            .await
            .unwrap();
        harness
            .engine
            .submit_scan(&round_id, "123456789")
            .await
            .unwrap();
        harness
            .engine
            .attach_photo(&round_id, "photo://gate".into())
            .await
            .unwrap();
        let mut visits = harness
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Visits]));

        // Act
        harness
            .store
            .fail_next_write(StoreError::Unavailable("link down".into()));
        let failed = harness
            .engine
            .finalize_checkpoint(&round_id, &"cp-gate".into())
            .await;
        let after_failure = visits.try_recv().unwrap();
        let retried = harness
            .engine
            .finalize_checkpoint(&round_id, &"cp-gate".into())
            .await;

        // Assert
        assert!(failed.unwrap_err().is_retryable());
        assert!(after_failure.is_none());
        assert!(retried.is_ok());
        assert_eq!(visits.drain().len(), 1);
    }
}
