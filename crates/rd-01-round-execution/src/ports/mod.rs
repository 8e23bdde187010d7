//! Ports module for round execution

pub mod inbound;
pub mod outbound;

pub use inbound::{
    AttemptReport, FinalizeOutcome, LocationOutcome, RoundExecutionApi, RoundProgress,
    ScanOutcome,
};
pub use outbound::{
    BaseControlStore, NewVisit, PatrolNotifier, RoundSnapshot, RoundStatusUpdate, RoundStore,
    SystemTimeSource, TimeSource,
};
