//! Workflow error types.

use adapters::AdapterError;
use common::{ListingId, SessionId};
use domain::DomainError;
use thiserror::Error;

/// Errors returned by workflow operations.
///
/// Every operation reports failure as a value; nothing escapes the
/// workflow boundary as a panic. The presentation layer renders these
/// directly.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Caller input violated a bound; raised before any remote call.
    #[error("validation failed: {0}")]
    Validation(#[from] DomainError),

    /// An external system call failed (transport or business refusal).
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// The inventory system reported success but omitted the listing
    /// id the workflow treats as mandatory. Never silently defaulted.
    #[error("inventory system returned success without a listing id")]
    MissingExternalId,

    /// Listing document not found in the store.
    #[error("listing not found: {0}")]
    ListingNotFound(ListingId),

    /// A seller tried to buy their own listing.
    #[error("a listing cannot be purchased by its own seller")]
    SelfPurchase,

    /// The listing was already purchased (possibly by a racing buyer).
    #[error("listing {0} has already been purchased")]
    AlreadyPurchased(ListingId),

    /// A caller other than the owner tried to cancel.
    #[error("only the owner may cancel a listing")]
    NotOwner,

    /// The payment processor reported the session as failed.
    #[error("payment session {0} failed")]
    PaymentFailed(SessionId),
}

/// Convenience type alias for workflow results.
pub type Result<T> = std::result::Result<T, WorkflowError>;
