//! # Demo Fixture Replay
//!
//! Runs `demos/patrol_round.json` through the patrol runtime exactly as the
//! binary does and checks every rejection the recorded guard ran into.

use patrol_runtime::Fixture;
use std::path::PathBuf;

pub(crate) fn demo_fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../demos/patrol_round.json")
}

pub(crate) fn demo_fixture() -> Fixture {
    Fixture::load(&demo_fixture_path()).expect("demo fixture loads")
}

#[cfg(test)]
mod tests {
    use super::*;
    use patrol_runtime::{ReplayRuntime, RuntimeConfig};
    use shared_bus::PatrolEvent;
    use shared_types::{CheckInMethod, RoundStatus};

    #[tokio::test]
    async fn test_demo_fixture_replays_to_incident_close() {
        // Setup
        let fixture = demo_fixture();
        let runtime = ReplayRuntime::new(RuntimeConfig::default());

        // Act
        let report = runtime.run(&fixture).await.unwrap();

        // Assert: the guard's mistakes, in order
        let rejected: Vec<(usize, &str)> = report
            .rejected
            .iter()
            .map(|r| (r.index, r.kind))
            .collect();
        assert_eq!(
            rejected,
            vec![
                (0, "precondition_violation"),
                (6, "out_of_sequence"),
                (11, "persistence_failure"),
                (16, "incomplete_requirements"),
                (19, "precondition_violation"),
            ]
        );
        assert_eq!(report.applied, fixture.steps.len() - 5);

        // The incident flag outlives completion
        assert_eq!(report.progress.status, RoundStatus::Incident);
        assert!(report.progress.is_complete());
        assert!(report.progress.has_arrival);
        assert!(report.progress.has_round_signature);

        let stored = runtime.round_store().round(&report.round_id).unwrap();
        assert_eq!(stored.status, RoundStatus::Incident);
        assert_eq!(stored.end_time, Some(1_700_001_710_000));
        assert!(stored.signature.is_some());
    }

    #[tokio::test]
    async fn test_demo_fixture_visits_and_events() {
        let fixture = demo_fixture();
        let runtime = ReplayRuntime::new(RuntimeConfig::default());

        let report = runtime.run(&fixture).await.unwrap();

        let visited: Vec<&str> = report
            .visits
            .iter()
            .map(|v| v.checkpoint_id.as_str())
            .collect();
        assert_eq!(visited, vec!["cp-gate", "cp-dock", "cp-office"]);
        assert_eq!(report.visits[0].check_in, CheckInMethod::Scan);
        assert_eq!(report.visits[1].check_in, CheckInMethod::ManualCode);
        // The retried dock finalize is the one on record
        assert_eq!(report.visits[1].visited_at, 1_700_000_690_000);
        assert!(report.visits[2].signature.is_some());

        assert_eq!(report.events.len(), 7);
        assert!(matches!(
            report.events.first(),
            Some(PatrolEvent::RoundStarted { .. })
        ));
        assert!(matches!(
            report.events[3],
            PatrolEvent::IncidentReported { .. }
        ));
        assert!(matches!(
            report.events.last(),
            Some(PatrolEvent::RoundClosed {
                status: RoundStatus::Incident,
                ..
            })
        ));
    }
}
