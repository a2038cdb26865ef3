//! Domain error types.

use thiserror::Error;

use crate::state::ListingState;

/// Errors raised by domain validation, before any remote call is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// Price outside the allowed 1..=1_000_000 yen range.
    #[error("price must be between 1 and 1,000,000 yen, got {yen}")]
    InvalidPrice { yen: i64 },

    /// Description exceeds the 500 character bound.
    #[error("description must be at most 500 characters, got {len}")]
    DescriptionTooLong { len: usize },

    /// A lifecycle transition the state machine does not allow.
    #[error("invalid listing state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: ListingState,
        to: ListingState,
    },
}
