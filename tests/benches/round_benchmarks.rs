//! # Round Execution Benchmarks
//!
//! Field-device latency budget per guard action:
//!
//! | Operation | Target |
//! |-----------|--------|
//! | Decode + match a scanned tag | < 10µs |
//! | Geofence check on a location update | < 1µs |
//! | Resume a 200-checkpoint route | < 1ms |
//! | Check-in → finalize on the in-memory store | < 100µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rd_01_round_execution::adapters::{
    InMemoryBaseControlStore, InMemoryRoundStore, ManualTimeSource, RecordingNotifier,
};
use rd_01_round_execution::domain::{decode, match_scan, GeofenceEvaluator};
use rd_01_round_execution::ports::{RoundExecutionApi, RoundSnapshot};
use rd_01_round_execution::{CheckpointSequencer, RoundExecutionConfig, RoundExecutionService};
use shared_types::{
    CheckInMethod, Checkpoint, CheckpointVisit, Coordinate, Round, RoundId, VisitId,
};
use std::sync::Arc;

fn gate() -> Checkpoint {
    Checkpoint::new("cp-gate", "Main gate", 1)
        .with_manual_code("123456789")
        .with_qr_code("QR-GATE")
        .with_location(Coordinate::new(-33.4489, -70.6693), 50.0)
}

fn route(len: u32) -> Vec<Checkpoint> {
    (1..=len)
        .map(|i| {
            Checkpoint::new(format!("cp-{i}").as_str(), format!("Stop {i}"), i)
                .with_manual_code(format!("{:09}", i))
        })
        .collect()
}

// ============================================================================
// IDENTIFIER MATCHER
// ============================================================================

fn bench_identifier_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("identifier");
    let checkpoint = gate();

    let inputs = [
        ("manual", "123456789".to_string()),
        (
            "structured",
            r#"{"type":"checkpoint","code":"QR-GATE","checkpoint_id":"cp-gate"}"#.to_string(),
        ),
        ("malformed", "12-34".to_string()),
    ];

    for (name, raw) in &inputs {
        group.bench_with_input(BenchmarkId::new("decode", name), raw, |b, raw| {
            b.iter(|| decode(black_box(raw), 9))
        });
        group.bench_with_input(BenchmarkId::new("match_scan", name), raw, |b, raw| {
            b.iter(|| match_scan(black_box(raw), &checkpoint, 9))
        });
    }

    group.finish();
}

// ============================================================================
// GEOFENCE EVALUATOR
// ============================================================================

fn bench_geofence(c: &mut Criterion) {
    let mut group = c.benchmark_group("geofence");
    let evaluator = GeofenceEvaluator::new(50.0);
    let checkpoint = gate();
    let inside = Coordinate::new(-33.4490, -70.6692);
    let outside = Coordinate::new(-33.4600, -70.6800);

    group.bench_function("contains_inside", |b| {
        b.iter(|| evaluator.contains(black_box(&inside), &checkpoint))
    });
    group.bench_function("contains_outside", |b| {
        b.iter(|| evaluator.contains(black_box(&outside), &checkpoint))
    });

    group.finish();
}

// ============================================================================
// CHECKPOINT SEQUENCER
// ============================================================================

fn bench_sequencer_resume(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequencer_resume");

    for len in [10u32, 50, 200] {
        let checkpoints = route(len);
        let visits: Vec<CheckpointVisit> = checkpoints
            .iter()
            .take(len as usize / 2)
            .enumerate()
            .map(|(i, cp)| CheckpointVisit {
                id: VisitId::from(format!("v-{i}")),
                round_id: RoundId::from("round-bench"),
                checkpoint_id: cp.id.clone(),
                visited_at: i as u64,
                location: None,
                signature: None,
                photo: None,
                duration_ms: 0,
                check_in: CheckInMethod::ManualCode,
            })
            .collect();

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| CheckpointSequencer::resume(checkpoints.clone(), black_box(&visits)))
        });
    }

    group.finish();
}

// ============================================================================
// ROUND EXECUTION SERVICE
// ============================================================================

fn bench_checkpoint_cycle(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let round_id: RoundId = "round-bench".into();
    let stops = 1_000u32;

    let store = Arc::new(InMemoryRoundStore::new());
    store.insert(RoundSnapshot {
        round: Round::new("round-bench"),
        checkpoints: route(stops),
        visits: Vec::new(),
    });
    let service = RoundExecutionService::new(
        RoundExecutionConfig::default(),
        store,
        Arc::new(InMemoryBaseControlStore::new()),
        Arc::new(RecordingNotifier::new()),
        Arc::new(ManualTimeSource::new(0)),
    );
    runtime.block_on(async {
        service.open_round(&round_id).await.expect("open");
        service.record_departure(&round_id, 0.0).await.expect("depart");
    });

    let mut next = 1u32;
    c.bench_function("scan_photo_finalize", |b| {
        b.iter(|| {
            if next > stops {
                return;
            }
            let code = format!("{:09}", next);
            let checkpoint_id = format!("cp-{next}").as_str().into();
            runtime.block_on(async {
                service.submit_scan(&round_id, &code).await.expect("scan");
                service
                    .attach_photo(&round_id, "photo://bench".into())
                    .await
                    .expect("photo");
                service
                    .finalize_checkpoint(&round_id, &checkpoint_id)
                    .await
                    .expect("finalize");
            });
            next += 1;
        })
    });
}

criterion_group!(
    benches,
    bench_identifier_matching,
    bench_geofence,
    bench_sequencer_resume,
    bench_checkpoint_cycle,
);

criterion_main!(benches);
