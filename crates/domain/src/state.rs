//! Listing lifecycle state machine.

use serde::{Deserialize, Serialize};

/// The state of a listing in its lifecycle.
///
/// State transitions:
/// ```text
/// Draft ──► Listed ──► Sold ──┬──► Granted ──► Closed
///              │              └──► FailedGrant
///              └─────► Cancelled ──► Closed
/// ```
///
/// `FailedGrant` is terminal-with-alert: the buyer paid but the
/// inventory grant did not go through, and the row waits for manual
/// resolution instead of being silently cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ListingState {
    /// Being prepared by the seller; nothing written anywhere yet.
    #[default]
    Draft,

    /// Visible in the marketplace and purchasable.
    Listed,

    /// Payment settled, inventory grant not yet confirmed.
    Sold,

    /// Item granted to the buyer; sale fully settled.
    Granted,

    /// Payment settled but the grant failed (terminal, alerting).
    FailedGrant,

    /// Retracted by the owner before sale.
    Cancelled,

    /// Store row deleted; nothing left to observe.
    Closed,
}

impl ListingState {
    /// Returns true if a buyer may purchase in this state.
    pub fn is_purchasable(&self) -> bool {
        matches!(self, ListingState::Listed)
    }

    /// Returns true if the owner may cancel in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(self, ListingState::Listed)
    }

    /// Returns true if this state ends the lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ListingState::Granted
                | ListingState::FailedGrant
                | ListingState::Cancelled
                | ListingState::Closed
        )
    }

    /// Returns true if the transition to `next` is allowed.
    pub fn can_transition_to(&self, next: ListingState) -> bool {
        use ListingState::*;
        matches!(
            (self, next),
            (Draft, Listed)
                | (Listed, Sold)
                | (Listed, Cancelled)
                | (Sold, Granted)
                | (Sold, FailedGrant)
                | (Granted, Closed)
                | (Cancelled, Closed)
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingState::Draft => "Draft",
            ListingState::Listed => "Listed",
            ListingState::Sold => "Sold",
            ListingState::Granted => "Granted",
            ListingState::FailedGrant => "FailedGrant",
            ListingState::Cancelled => "Cancelled",
            ListingState::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for ListingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
