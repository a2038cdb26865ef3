//! Purchase settlement strategies.
//!
//! The processor path and the mock/test path both implement
//! [`PurchaseStrategy`]; the caller picks one explicitly instead of
//! the path being chosen by an ambient environment flag.

use async_trait::async_trait;
use common::{ItemInstanceId, ListingId, SessionId};
use domain::{Listing, PaymentMethod, SessionContext};
use uuid::Uuid;

use adapters::{CheckoutRequest, InventorySystem, PaymentProcessor};

use crate::error::{Result, WorkflowError};

/// What a strategy did to settle a purchase.
#[derive(Debug, Clone)]
pub enum Settlement {
    /// The item is in the buyer's inventory; the sale can be recorded.
    Granted {
        item_instance_id: ItemInstanceId,
        /// True when the instance is a placeholder rather than a real
        /// grant (mock path fallback).
        synthetic: bool,
    },
    /// The buyer must complete checkout; settlement continues in the
    /// confirmation flow.
    Redirect {
        session_id: SessionId,
        checkout_url: String,
    },
}

/// One way of settling a purchase.
#[async_trait]
pub trait PurchaseStrategy: Send + Sync {
    /// Settles the purchase of `listing` for `buyer`.
    ///
    /// Strategies touch their own external system only; all store
    /// mutation stays in the workflow engine.
    async fn settle(
        &self,
        listing_id: &ListingId,
        listing: &Listing,
        buyer: &SessionContext,
    ) -> Result<Settlement>;

    /// The payment method recorded on the listing row.
    fn method(&self) -> PaymentMethod;
}

/// Derives the grant idempotency key for a listing.
///
/// Keyed on the external listing id so a retried grant for the same
/// sale returns the original instance; rows without one fall back to
/// the store id, which is equally unique per sale.
pub(crate) fn grant_key(listing_id: &ListingId, listing: &Listing) -> String {
    listing
        .external_listing_id
        .clone()
        .unwrap_or_else(|| format!("listing_{listing_id}"))
}

/// Real-money path: create a checkout session and hand the buyer off
/// to the processor.
#[derive(Debug, Clone)]
pub struct CheckoutStrategy<P> {
    payment: P,
}

impl<P: PaymentProcessor> CheckoutStrategy<P> {
    /// Creates the processor-path strategy.
    pub fn new(payment: P) -> Self {
        Self { payment }
    }
}

#[async_trait]
impl<P: PaymentProcessor> PurchaseStrategy for CheckoutStrategy<P> {
    async fn settle(
        &self,
        listing_id: &ListingId,
        listing: &Listing,
        _buyer: &SessionContext,
    ) -> Result<Settlement> {
        let description = if listing.description.as_str().is_empty() {
            format!("{}の購入", listing.title)
        } else {
            listing.description.to_string()
        };

        let session = self
            .payment
            .create_session(CheckoutRequest {
                listing_id: listing_id.clone(),
                amount: listing.price,
                title: listing.title.clone(),
                description,
            })
            .await?;

        Ok(Settlement::Redirect {
            session_id: session.session_id,
            checkout_url: session.checkout_url,
        })
    }

    fn method(&self) -> PaymentMethod {
        PaymentMethod::Processor
    }
}

/// Non-production test path: grant the item directly, skipping payment
/// capture entirely.
#[derive(Debug, Clone)]
pub struct MockStrategy<I> {
    inventory: I,
    synthetic_fallback: bool,
}

impl<I: InventorySystem> MockStrategy<I> {
    /// Creates the mock-path strategy. Grant failures propagate.
    pub fn new(inventory: I) -> Self {
        Self {
            inventory,
            synthetic_fallback: false,
        }
    }

    /// Creates the mock-path strategy with the placeholder fallback:
    /// when the real grant is refused, a synthetic `mock_` instance id
    /// stands in so the flow can still be exercised end to end.
    pub fn with_synthetic_fallback(inventory: I) -> Self {
        Self {
            inventory,
            synthetic_fallback: true,
        }
    }
}

#[async_trait]
impl<I: InventorySystem> PurchaseStrategy for MockStrategy<I> {
    async fn settle(
        &self,
        listing_id: &ListingId,
        listing: &Listing,
        buyer: &SessionContext,
    ) -> Result<Settlement> {
        let key = grant_key(listing_id, listing);
        let result = self
            .inventory
            .grant(
                buyer,
                &listing.external_catalog_id,
                &listing.item_details.catalog_version,
                &listing.item_details.custom_data,
                &key,
            )
            .await;

        match result {
            Ok(granted) => Ok(Settlement::Granted {
                item_instance_id: granted.item_instance_id,
                synthetic: false,
            }),
            Err(adapters::AdapterError::RemoteRejected(reason)) if self.synthetic_fallback => {
                tracing::warn!(%listing_id, %reason, "grant refused, using synthetic instance");
                let suffix = Uuid::new_v4().simple().to_string();
                Ok(Settlement::Granted {
                    item_instance_id: ItemInstanceId::new(format!("mock_{}", &suffix[..8])),
                    synthetic: true,
                })
            }
            Err(e) => Err(WorkflowError::from(e)),
        }
    }

    fn method(&self) -> PaymentMethod {
        PaymentMethod::Mock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapters::{InMemoryInventorySystem, InMemoryPaymentProcessor};
    use common::{CatalogItemId, ItemInstanceId, UserId};
    use domain::{Description, InventoryItem, Price};

    fn listing() -> (ListingId, Listing) {
        let item = InventoryItem {
            item_instance_id: ItemInstanceId::new("inst-1"),
            item_id: CatalogItemId::new("sword_01"),
            catalog_version: None,
            display_name: Some("Iron Sword".to_string()),
            custom_data: None,
            remaining_uses: None,
        };
        let seller = SessionContext::new(UserId::new("seller"), None, "t-seller");
        let listing = Listing::from_sale(
            &item,
            Price::new(1000).unwrap(),
            Description::empty(),
            &seller,
            "marketplace_inst-1_1".to_string(),
            None,
        );
        (ListingId::new("L1"), listing)
    }

    fn buyer() -> SessionContext {
        SessionContext::new(UserId::new("buyer"), None, "t-buyer")
    }

    #[tokio::test]
    async fn checkout_strategy_redirects() {
        let payment = InMemoryPaymentProcessor::new();
        let strategy = CheckoutStrategy::new(payment.clone());
        let (id, listing) = listing();

        let settlement = strategy.settle(&id, &listing, &buyer()).await.unwrap();
        match settlement {
            Settlement::Redirect { checkout_url, .. } => {
                assert!(checkout_url.starts_with("https://"));
            }
            other => panic!("expected redirect, got {other:?}"),
        }
        assert_eq!(payment.session_count(), 1);
        assert_eq!(strategy.method(), PaymentMethod::Processor);
    }

    #[tokio::test]
    async fn mock_strategy_grants_with_listing_key() {
        let inventory = InMemoryInventorySystem::new();
        let strategy = MockStrategy::new(inventory.clone());
        let (id, listing) = listing();

        let settlement = strategy.settle(&id, &listing, &buyer()).await.unwrap();
        match settlement {
            Settlement::Granted {
                item_instance_id,
                synthetic,
            } => {
                assert!(!synthetic);
                assert!(item_instance_id.as_str().starts_with("ITEM-"));
            }
            other => panic!("expected grant, got {other:?}"),
        }
        assert_eq!(inventory.grant_count(), 1);
        assert_eq!(strategy.method(), PaymentMethod::Mock);
    }

    #[tokio::test]
    async fn mock_strategy_propagates_refusal_without_fallback() {
        let inventory = InMemoryInventorySystem::new();
        inventory.set_fail_on_grant(true);
        let strategy = MockStrategy::new(inventory);
        let (id, listing) = listing();

        let err = strategy.settle(&id, &listing, &buyer()).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Adapter(adapters::AdapterError::RemoteRejected(_))
        ));
    }

    #[tokio::test]
    async fn mock_strategy_synthetic_fallback() {
        let inventory = InMemoryInventorySystem::new();
        inventory.set_fail_on_grant(true);
        let strategy = MockStrategy::with_synthetic_fallback(inventory);
        let (id, listing) = listing();

        let settlement = strategy.settle(&id, &listing, &buyer()).await.unwrap();
        match settlement {
            Settlement::Granted {
                item_instance_id,
                synthetic,
            } => {
                assert!(synthetic);
                assert!(item_instance_id.as_str().starts_with("mock_"));
            }
            other => panic!("expected grant, got {other:?}"),
        }
    }

    #[test]
    fn grant_key_prefers_external_id() {
        let (id, mut l) = listing();
        assert_eq!(grant_key(&id, &l), "marketplace_inst-1_1");
        l.external_listing_id = None;
        assert_eq!(grant_key(&id, &l), "listing_L1");
    }
}
