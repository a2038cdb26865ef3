//! Adapter error types.

use common::ListingId;
use thiserror::Error;

/// Errors surfaced by the external system adapters.
///
/// The split between `RemoteUnavailable` and `RemoteRejected` matters
/// to callers: transport failures abort the current operation, while
/// business refusals are surfaced verbatim to the end user.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Transport-level failure talking to an external system.
    #[error("external system unavailable: {0}")]
    RemoteUnavailable(String),

    /// The external system's business logic refused the request.
    #[error("external system rejected the request: {0}")]
    RemoteRejected(String),

    /// Listing document not found in the store.
    #[error("listing not found: {0}")]
    NotFound(ListingId),

    /// A batch write exceeded the store's per-commit limit.
    #[error("batch of {len} operations exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    /// Payload could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for adapter results.
pub type Result<T> = std::result::Result<T, AdapterError>;
