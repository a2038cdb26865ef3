//! The listing workflow engine.
//!
//! Orchestrates the multi-step operations (`list`, `purchase`,
//! `confirm_payment`, `cancel`) across the three external systems.
//! Ordering and compensation rules live here; the adapters stay dumb.

use std::time::Duration;

use common::{ListingId, SessionId};
use domain::{
    Description, DomainError, InventoryItem, Listing, ListingPatch, ListingState, Price,
    SessionContext,
};

use adapters::{InventorySystem, ListingStore, PaymentProcessor, PaymentStatus};

use crate::error::{Result, WorkflowError};
use crate::outcome::{CancelOutcome, ConfirmOutcome, ListOutcome, PurchaseOutcome, Warning};
use crate::strategy::{PurchaseStrategy, Settlement, grant_key};

/// Retry budget for the payment confirmation poll.
///
/// The loop polls, sleeps, and repeats; when the budget runs out it
/// reports pending rather than failing, since the processor may still
/// settle the session afterwards.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

impl PollPolicy {
    /// A policy that never sleeps, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }
}

/// Orchestrates the listing lifecycle across the inventory system,
/// the listing store, and the payment processor.
///
/// The store is the cache of record for browsing; the inventory
/// system is the source of truth for ownership. Operations order
/// their external calls so that the unrecoverable divergence (a store
/// row pointing at a nonexistent external listing) cannot be created;
/// the recoverable direction is left to the reconciliation service.
pub struct ListingWorkflow<I, S, P>
where
    I: InventorySystem,
    S: ListingStore,
    P: PaymentProcessor,
{
    inventory: I,
    store: S,
    payment: P,
    poll: PollPolicy,
}

impl<I, S, P> ListingWorkflow<I, S, P>
where
    I: InventorySystem,
    S: ListingStore,
    P: PaymentProcessor,
{
    /// Creates a workflow engine over the three adapters.
    pub fn new(inventory: I, store: S, payment: P) -> Self {
        Self {
            inventory,
            store,
            payment,
            poll: PollPolicy::default(),
        }
    }

    /// Overrides the payment confirmation poll policy.
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Lists an item for sale.
    ///
    /// Validates locally, then calls the inventory system, then writes
    /// the store row. Any failure before the store write leaves zero
    /// store state behind; the external listing id gate is hard.
    #[tracing::instrument(skip(self, seller, item), fields(item = %item.item_instance_id))]
    pub async fn list(
        &self,
        seller: &SessionContext,
        item: &InventoryItem,
        price_yen: i64,
        description: &str,
    ) -> Result<ListOutcome> {
        // Validation happens before any remote call.
        let price = Price::new(price_yen)?;
        let description = Description::new(description)?;

        let listed = self
            .inventory
            .list_for_sale(seller, &item.item_instance_id, price, &description)
            .await?;

        if listed.external_listing_id.is_empty() {
            tracing::error!(item = %item.item_instance_id, "inventory listing succeeded without an id");
            return Err(WorkflowError::MissingExternalId);
        }

        // Best-effort: the seller's inventory identity is nice to have
        // on the row but must never abort the listing.
        let mut warnings = Vec::new();
        let seller_external_id = match self.inventory.fetch_session_identity(seller).await {
            Ok(player) => Some(player),
            Err(e) => {
                tracing::warn!(error = %e, "seller identity lookup failed, listing continues");
                warnings.push(Warning::SellerIdentityUnavailable(e.to_string()));
                None
            }
        };

        let listing = Listing::from_sale(
            item,
            price,
            description,
            seller,
            listed.external_listing_id.clone(),
            seller_external_id,
        );
        let listing_id = self.store.create(listing).await?;

        metrics::counter!("listings_created_total").increment(1);
        tracing::info!(%listing_id, external_listing_id = %listed.external_listing_id, "listing created");

        Ok(ListOutcome {
            listing_id,
            external_listing_id: listed.external_listing_id,
            warnings,
        })
    }

    /// Purchases a listing using the given settlement strategy.
    ///
    /// The row is re-read immediately before acting to narrow the race
    /// window against concurrent buyers; this is best-effort, not a
    /// lock, and the grant idempotency key catches the remainder.
    #[tracing::instrument(skip(self, buyer, strategy), fields(buyer = %buyer.user))]
    pub async fn purchase<T: PurchaseStrategy>(
        &self,
        buyer: &SessionContext,
        listing_id: &ListingId,
        strategy: &T,
    ) -> Result<PurchaseOutcome> {
        let listing = self.load(listing_id).await?;

        if listing.owner == buyer.user {
            return Err(WorkflowError::SelfPurchase);
        }
        // Both the flag pair and the lifecycle state must agree that
        // the row is still for sale; divergent rows wait for repair.
        if !listing.is_available() || !listing.state.is_purchasable() {
            return Err(WorkflowError::AlreadyPurchased(listing_id.clone()));
        }
        ensure_transition(listing.state, ListingState::Sold)?;

        match strategy.settle(listing_id, &listing, buyer).await? {
            Settlement::Granted {
                item_instance_id,
                synthetic,
            } => {
                // Item is already in the buyer's inventory; record the
                // sale. Deletion of the row is deferred to the sweeper.
                let mut patch = ListingPatch::sold_to(buyer.user.clone(), strategy.method());
                patch.state = Some(ListingState::Granted);
                self.store.update(listing_id, patch).await?;

                let mut warnings = Vec::new();
                if synthetic {
                    warnings.push(Warning::SyntheticGrant(item_instance_id.to_string()));
                }

                metrics::counter!("purchases_completed_total").increment(1);
                tracing::info!(%listing_id, %item_instance_id, "purchase settled");

                Ok(PurchaseOutcome::Granted {
                    listing_id: listing_id.clone(),
                    item_instance_id,
                    warnings,
                })
            }
            Settlement::Redirect {
                session_id,
                checkout_url,
            } => {
                // No store mutation until the processor confirms.
                tracing::info!(%listing_id, %session_id, "checkout session created");
                Ok(PurchaseOutcome::RedirectToCheckout {
                    listing_id: listing_id.clone(),
                    session_id,
                    checkout_url,
                })
            }
        }
    }

    /// Confirms a processor-path purchase after redirect return.
    ///
    /// Polls the session status under the configured budget. On
    /// completion the row is marked sold and the item granted; a grant
    /// failure parks the row in `FailedGrant` and is reported, never
    /// hidden.
    #[tracing::instrument(skip(self, buyer), fields(buyer = %buyer.user))]
    pub async fn confirm_payment(
        &self,
        buyer: &SessionContext,
        listing_id: &ListingId,
        session_id: &SessionId,
    ) -> Result<ConfirmOutcome> {
        let mut completed = false;
        for attempt in 1..=self.poll.max_attempts {
            match self.payment.status(session_id).await? {
                PaymentStatus::Completed => {
                    completed = true;
                    break;
                }
                PaymentStatus::Failed => {
                    return Err(WorkflowError::PaymentFailed(session_id.clone()));
                }
                PaymentStatus::Pending => {
                    tracing::debug!(%session_id, attempt, "payment still pending");
                    if attempt < self.poll.max_attempts {
                        tokio::time::sleep(self.poll.delay).await;
                    }
                }
            }
        }
        if !completed {
            return Ok(ConfirmOutcome::Pending);
        }

        let listing = self.load(listing_id).await?;
        if listing.purchased || listing.state.is_terminal() {
            return Err(WorkflowError::AlreadyPurchased(listing_id.clone()));
        }
        ensure_transition(listing.state, ListingState::Sold)?;

        // Money has moved; record the sale first, then grant. A crash
        // between the two writes is what the grant idempotency key and
        // the FailedGrant state exist for.
        self.store
            .update(
                listing_id,
                ListingPatch::sold_to(buyer.user.clone(), domain::PaymentMethod::Processor),
            )
            .await?;

        let key = grant_key(listing_id, &listing);
        match self
            .inventory
            .grant(
                buyer,
                &listing.external_catalog_id,
                &listing.item_details.catalog_version,
                &listing.item_details.custom_data,
                &key,
            )
            .await
        {
            Ok(granted) => {
                self.store
                    .update(listing_id, ListingPatch::granted())
                    .await?;
                metrics::counter!("purchases_completed_total").increment(1);
                tracing::info!(%listing_id, item = %granted.item_instance_id, "payment confirmed and item granted");
                Ok(ConfirmOutcome::Completed {
                    item_instance_id: granted.item_instance_id,
                })
            }
            Err(e) => {
                let reason = e.to_string();
                self.store
                    .update(listing_id, ListingPatch::grant_failed(&reason))
                    .await?;
                metrics::counter!("grant_failures_total").increment(1);
                tracing::error!(%listing_id, %session_id, %reason, "paid but grant failed; row parked for manual resolution");
                Ok(ConfirmOutcome::GrantFailed { reason })
            }
        }
    }

    /// Cancels a listing. Owner only.
    ///
    /// Retracts the external listing before deleting the row: deleting
    /// first would orphan the external listing, which is the
    /// unrecoverable direction. A business refusal on retraction
    /// (listing already gone externally) downgrades to a warning; a
    /// transport failure aborts so the row stays visible.
    #[tracing::instrument(skip(self, owner), fields(caller = %owner.user))]
    pub async fn cancel(
        &self,
        owner: &SessionContext,
        listing_id: &ListingId,
    ) -> Result<CancelOutcome> {
        let listing = self.load(listing_id).await?;

        if listing.owner != owner.user {
            return Err(WorkflowError::NotOwner);
        }
        if listing.purchased || !listing.state.can_cancel() {
            return Err(WorkflowError::AlreadyPurchased(listing_id.clone()));
        }

        let mut warnings = Vec::new();
        match listing.external_listing_id.as_deref() {
            Some(external_id) => match self.inventory.retract_listing(owner, external_id).await {
                Ok(()) => {}
                Err(adapters::AdapterError::RemoteRejected(reason)) => {
                    tracing::warn!(%listing_id, %reason, "external retraction refused, deleting row anyway");
                    warnings.push(Warning::ExternalRetractionSkipped(reason));
                }
                Err(e) => return Err(e.into()),
            },
            None => {
                warnings.push(Warning::ExternalRetractionSkipped(
                    "row has no external listing id".to_string(),
                ));
            }
        }

        self.store.delete(listing_id).await?;
        metrics::counter!("listings_cancelled_total").increment(1);
        tracing::info!(%listing_id, "listing cancelled");

        Ok(CancelOutcome {
            listing_id: listing_id.clone(),
            warnings,
        })
    }

    /// The browse query: available listings, newest first.
    pub async fn browse(&self) -> Result<Vec<(ListingId, Listing)>> {
        Ok(self.store.query_available().await?)
    }

    /// Loads a single listing.
    pub async fn get(&self, listing_id: &ListingId) -> Result<Option<Listing>> {
        Ok(self.store.get(listing_id).await?)
    }

    async fn load(&self, listing_id: &ListingId) -> Result<Listing> {
        self.store
            .get(listing_id)
            .await?
            .ok_or_else(|| WorkflowError::ListingNotFound(listing_id.clone()))
    }
}

/// Rejects a state write the lifecycle machine does not allow.
///
/// Every operation checks the row's recorded state before its first
/// state-changing write, so a row that drifted outside the sale path
/// (or a legacy row that never recorded a state) fails loudly instead
/// of being patched into an impossible history.
fn ensure_transition(from: ListingState, to: ListingState) -> Result<()> {
    if !from.can_transition_to(to) {
        return Err(WorkflowError::Validation(
            DomainError::InvalidStateTransition { from, to },
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_path_transitions_allowed() {
        assert!(ensure_transition(ListingState::Listed, ListingState::Sold).is_ok());
        assert!(ensure_transition(ListingState::Sold, ListingState::Granted).is_ok());
        assert!(ensure_transition(ListingState::Sold, ListingState::FailedGrant).is_ok());
    }

    #[test]
    fn off_path_transition_names_both_states() {
        let err = ensure_transition(ListingState::Draft, ListingState::Sold).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(DomainError::InvalidStateTransition {
                from: ListingState::Draft,
                to: ListingState::Sold,
            })
        ));
    }
}
