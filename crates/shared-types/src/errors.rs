//! # Error Types
//!
//! Defines error types returned by storage collaborators.

use thiserror::Error;

/// Errors that can occur in a round or base-control store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A visit for this checkpoint already exists in this round.
    #[error("Duplicate visit: checkpoint {checkpoint_id} already visited in round {round_id}")]
    DuplicateVisit {
        round_id: String,
        checkpoint_id: String,
    },

    /// The backend could not be reached or timed out.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the write.
    #[error("Write rejected: {0}")]
    Rejected(String),
}
