//! # Round Execution Metrics
//!
//! Prometheus metrics for patrol rounds.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! rd-01-round-execution = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `rounds_visits_recorded_total` - Counter of durable checkpoint visits
//! - `rounds_operations_rejected_total` - Counter of rejected operations (by reason)
//! - `rounds_persistence_failures_total` - Counter of failed store writes (by operation)
//! - `rounds_closed_total` - Counter of closed rounds (by status)
//! - `rounds_open_sessions` - Gauge of open round sessions

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter_vec, register_gauge, register_int_counter, CounterVec, Gauge, IntCounter,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total visits the store acknowledged
    pub static ref VISITS_RECORDED: IntCounter = register_int_counter!(
        "rounds_visits_recorded_total",
        "Total number of checkpoint visits recorded"
    )
    .expect("Failed to create VISITS_RECORDED metric");

    /// Rejected operations, labeled by error kind
    pub static ref OPERATIONS_REJECTED: CounterVec = register_counter_vec!(
        "rounds_operations_rejected_total",
        "Total number of rejected round operations",
        &["reason"]
    )
    .expect("Failed to create OPERATIONS_REJECTED metric");

    /// Failed store writes, labeled by operation
    pub static ref PERSISTENCE_FAILURES: CounterVec = register_counter_vec!(
        "rounds_persistence_failures_total",
        "Total number of failed store writes",
        &["operation"]
    )
    .expect("Failed to create PERSISTENCE_FAILURES metric");

    /// Closed rounds, labeled by final status
    pub static ref ROUNDS_CLOSED: CounterVec = register_counter_vec!(
        "rounds_closed_total",
        "Total number of closed rounds",
        &["status"]
    )
    .expect("Failed to create ROUNDS_CLOSED metric");

    /// Sessions currently open
    pub static ref OPEN_SESSIONS: Gauge = register_gauge!(
        "rounds_open_sessions",
        "Number of open round sessions"
    )
    .expect("Failed to create OPEN_SESSIONS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn record_visit_recorded() {
    VISITS_RECORDED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_rejection(reason: &str) {
    OPERATIONS_REJECTED.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_persistence_failure(operation: &str) {
    PERSISTENCE_FAILURES.with_label_values(&[operation]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_round_closed(status: &str) {
    ROUNDS_CLOSED.with_label_values(&[status]).inc();
}

#[cfg(feature = "metrics")]
pub fn set_open_sessions(count: usize) {
    OPEN_SESSIONS.set(count as f64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_visit_recorded() {}

#[cfg(not(feature = "metrics"))]
pub fn record_rejection(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_persistence_failure(_operation: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_round_closed(_status: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn set_open_sessions(_count: usize) {}
