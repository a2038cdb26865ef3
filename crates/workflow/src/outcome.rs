//! Operation outcomes and warnings.

use common::{ItemInstanceId, ListingId, SessionId};
use serde::Serialize;

/// A non-fatal problem captured during an otherwise successful
/// operation. Best-effort sub-steps attach these instead of failing
/// the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Warning {
    /// Seller's inventory identity could not be resolved; the listing
    /// was created without it.
    SellerIdentityUnavailable(String),
    /// The external listing could not be retracted on cancel; the
    /// store row was still removed.
    ExternalRetractionSkipped(String),
    /// The grant was replaced by a synthetic placeholder instance
    /// (mock path fallback).
    SyntheticGrant(String),
}

/// Result of a successful List operation.
#[derive(Debug, Clone, Serialize)]
pub struct ListOutcome {
    pub listing_id: ListingId,
    /// The id the inventory system assigned, persisted verbatim.
    pub external_listing_id: String,
    pub warnings: Vec<Warning>,
}

/// Result of a successful Purchase operation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PurchaseOutcome {
    /// Mock path: the item is already in the buyer's inventory.
    Granted {
        listing_id: ListingId,
        item_instance_id: ItemInstanceId,
        warnings: Vec<Warning>,
    },
    /// Processor path: the buyer must complete checkout at the URL;
    /// settlement is confirmed later via `confirm_payment`.
    RedirectToCheckout {
        listing_id: ListingId,
        session_id: SessionId,
        checkout_url: String,
    },
}

/// Result of the payment confirmation flow.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConfirmOutcome {
    /// Payment captured and item granted.
    Completed { item_instance_id: ItemInstanceId },
    /// Retry budget exhausted while the session was still pending.
    /// Not a failure; the caller may confirm again later.
    Pending,
    /// Payment captured but the grant failed; the row is parked in
    /// the alerting FailedGrant state for manual resolution.
    GrantFailed { reason: String },
}

/// Result of a successful Cancel operation.
#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub listing_id: ListingId,
    pub warnings: Vec<Warning>,
}
