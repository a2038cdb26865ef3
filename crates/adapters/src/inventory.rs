//! Inventory system adapter trait and in-memory implementation.
//!
//! A networked implementation of [`InventorySystem`] decodes every
//! remote call through the envelope in [`crate::rpc`]; the in-memory
//! double used for tests skips the wire format but honors the same
//! trait contract.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use common::{CatalogItemId, ItemInstanceId, PlayerId};
use domain::{Description, LISTING_ID_PREFIX, Price, SessionContext};
use serde_json::{Map, Value};

use crate::error::AdapterError;

/// Result of listing an item for sale on the inventory system.
#[derive(Debug, Clone)]
pub struct ListedItem {
    /// Id assigned by the inventory system's marketplace function.
    ///
    /// The workflow treats an empty value as a fatal inconsistency;
    /// the adapter reports whatever the remote returned.
    pub external_listing_id: String,
}

/// Result of granting an item instance to a buyer.
#[derive(Debug, Clone)]
pub struct GrantedItem {
    /// Instance id of the newly created copy in the buyer's inventory.
    pub item_instance_id: ItemInstanceId,
}

/// The external service of record for virtual item ownership.
///
/// Listing an item removes it from the seller's active inventory as a
/// side effect of the remote marketplace function; granting creates a
/// new instance for the buyer. There is no transaction spanning these
/// calls and any store write.
#[async_trait]
pub trait InventorySystem: Send + Sync {
    /// Marks an item as being sold and removes it from the seller's
    /// active inventory. Fails with `RemoteRejected` if the item is
    /// already listed, already consumed, or not owned by the caller.
    async fn list_for_sale(
        &self,
        session: &SessionContext,
        item_instance_id: &ItemInstanceId,
        price: Price,
        description: &Description,
    ) -> Result<ListedItem, AdapterError>;

    /// Creates a new inventory instance for the buyer, copying custom
    /// data. The idempotency key (derived from the external listing
    /// id) makes retried grants return the original instance instead
    /// of minting a duplicate.
    async fn grant(
        &self,
        buyer: &SessionContext,
        catalog_item_id: &CatalogItemId,
        catalog_version: &str,
        custom_data: &Map<String, Value>,
        idempotency_key: &str,
    ) -> Result<GrantedItem, AdapterError>;

    /// Retracts a previously created marketplace listing.
    async fn retract_listing(
        &self,
        session: &SessionContext,
        external_listing_id: &str,
    ) -> Result<(), AdapterError>;

    /// Resolves the caller's inventory-system identity.
    async fn fetch_session_identity(
        &self,
        session: &SessionContext,
    ) -> Result<PlayerId, AdapterError>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    /// external_listing_id -> instance put up for sale
    listings: HashMap<String, ItemInstanceId>,
    /// Instances currently listed (for double-list rejection).
    listed_instances: HashSet<ItemInstanceId>,
    /// idempotency_key -> instance already granted under that key
    grants: HashMap<String, ItemInstanceId>,
    /// session_ticket -> inventory identity
    identities: HashMap<String, PlayerId>,
    grant_count: u32,
    next_id: u32,
    offline: bool,
    fail_on_list: bool,
    fail_on_grant: bool,
    fail_identity_fetch: bool,
    return_empty_listing_id: bool,
}

/// In-memory inventory system for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventorySystem {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventorySystem {
    /// Creates a new in-memory inventory system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an inventory identity for a session ticket.
    pub fn register_identity(&self, session_ticket: &str, player: PlayerId) {
        self.state
            .write()
            .unwrap()
            .identities
            .insert(session_ticket.to_string(), player);
    }

    /// Simulates the whole system being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.state.write().unwrap().offline = offline;
    }

    /// Configures list calls to be refused by the remote business logic.
    pub fn set_fail_on_list(&self, fail: bool) {
        self.state.write().unwrap().fail_on_list = fail;
    }

    /// Configures grant calls to be refused by the remote business logic.
    pub fn set_fail_on_grant(&self, fail: bool) {
        self.state.write().unwrap().fail_on_grant = fail;
    }

    /// Configures identity lookups to fail.
    pub fn set_fail_identity_fetch(&self, fail: bool) {
        self.state.write().unwrap().fail_identity_fetch = fail;
    }

    /// Configures list calls to succeed but omit the listing id,
    /// reproducing the inconsistency the workflow must treat as fatal.
    pub fn set_return_empty_listing_id(&self, empty: bool) {
        self.state.write().unwrap().return_empty_listing_id = empty;
    }

    /// Number of currently active external listings.
    pub fn listing_count(&self) -> usize {
        self.state.read().unwrap().listings.len()
    }

    /// Number of grants actually performed (idempotent retries excluded).
    pub fn grant_count(&self) -> u32 {
        self.state.read().unwrap().grant_count
    }

    /// True if an external listing with the given id is active.
    pub fn has_listing(&self, external_listing_id: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .listings
            .contains_key(external_listing_id)
    }
}

#[async_trait]
impl InventorySystem for InMemoryInventorySystem {
    async fn list_for_sale(
        &self,
        _session: &SessionContext,
        item_instance_id: &ItemInstanceId,
        _price: Price,
        _description: &Description,
    ) -> Result<ListedItem, AdapterError> {
        let mut state = self.state.write().unwrap();

        if state.offline {
            return Err(AdapterError::RemoteUnavailable(
                "inventory system unreachable".to_string(),
            ));
        }
        if state.fail_on_list {
            return Err(AdapterError::RemoteRejected(
                "item is already listed or not owned by the caller".to_string(),
            ));
        }
        if state.return_empty_listing_id {
            return Ok(ListedItem {
                external_listing_id: String::new(),
            });
        }
        if state.listed_instances.contains(item_instance_id) {
            return Err(AdapterError::RemoteRejected(format!(
                "item {item_instance_id} is already listed"
            )));
        }

        let external_listing_id = format!(
            "{LISTING_ID_PREFIX}{item_instance_id}_{}",
            Utc::now().timestamp_millis()
        );
        state.listed_instances.insert(item_instance_id.clone());
        state
            .listings
            .insert(external_listing_id.clone(), item_instance_id.clone());

        Ok(ListedItem {
            external_listing_id,
        })
    }

    async fn grant(
        &self,
        _buyer: &SessionContext,
        catalog_item_id: &CatalogItemId,
        _catalog_version: &str,
        _custom_data: &Map<String, Value>,
        idempotency_key: &str,
    ) -> Result<GrantedItem, AdapterError> {
        let mut state = self.state.write().unwrap();

        if state.offline {
            return Err(AdapterError::RemoteUnavailable(
                "inventory system unreachable".to_string(),
            ));
        }
        if state.fail_on_grant {
            return Err(AdapterError::RemoteRejected(format!(
                "unknown catalog item: {catalog_item_id}"
            )));
        }
        if let Some(existing) = state.grants.get(idempotency_key) {
            return Ok(GrantedItem {
                item_instance_id: existing.clone(),
            });
        }

        state.next_id += 1;
        state.grant_count += 1;
        let instance = ItemInstanceId::new(format!("ITEM-{:04}", state.next_id));
        state
            .grants
            .insert(idempotency_key.to_string(), instance.clone());

        Ok(GrantedItem {
            item_instance_id: instance,
        })
    }

    async fn retract_listing(
        &self,
        _session: &SessionContext,
        external_listing_id: &str,
    ) -> Result<(), AdapterError> {
        let mut state = self.state.write().unwrap();

        if state.offline {
            return Err(AdapterError::RemoteUnavailable(
                "inventory system unreachable".to_string(),
            ));
        }
        match state.listings.remove(external_listing_id) {
            Some(instance) => {
                state.listed_instances.remove(&instance);
                Ok(())
            }
            None => Err(AdapterError::RemoteRejected(format!(
                "no such marketplace listing: {external_listing_id}"
            ))),
        }
    }

    async fn fetch_session_identity(
        &self,
        session: &SessionContext,
    ) -> Result<PlayerId, AdapterError> {
        let state = self.state.read().unwrap();

        if state.offline || state.fail_identity_fetch {
            return Err(AdapterError::RemoteUnavailable(
                "inventory session lookup failed".to_string(),
            ));
        }
        state
            .identities
            .get(&session.session_ticket)
            .cloned()
            .ok_or_else(|| {
                AdapterError::RemoteRejected("no inventory session for this ticket".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UserId;

    fn session() -> SessionContext {
        SessionContext::new(UserId::new("u1"), None, "ticket-1")
    }

    #[tokio::test]
    async fn list_assigns_prefixed_external_id() {
        let inventory = InMemoryInventorySystem::new();
        let listed = inventory
            .list_for_sale(
                &session(),
                &ItemInstanceId::new("inst-1"),
                Price::new(100).unwrap(),
                &Description::empty(),
            )
            .await
            .unwrap();

        assert!(listed.external_listing_id.starts_with(LISTING_ID_PREFIX));
        assert_eq!(inventory.listing_count(), 1);
        assert!(inventory.has_listing(&listed.external_listing_id));
    }

    #[tokio::test]
    async fn double_listing_rejected() {
        let inventory = InMemoryInventorySystem::new();
        let instance = ItemInstanceId::new("inst-1");
        let price = Price::new(100).unwrap();

        inventory
            .list_for_sale(&session(), &instance, price, &Description::empty())
            .await
            .unwrap();
        let err = inventory
            .list_for_sale(&session(), &instance, price, &Description::empty())
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::RemoteRejected(_)));
        assert_eq!(inventory.listing_count(), 1);
    }

    #[tokio::test]
    async fn grant_is_idempotent_per_key() {
        let inventory = InMemoryInventorySystem::new();
        let catalog = CatalogItemId::new("sword_01");
        let data = Map::new();

        let first = inventory
            .grant(&session(), &catalog, "main", &data, "marketplace_i1_1")
            .await
            .unwrap();
        let retry = inventory
            .grant(&session(), &catalog, "main", &data, "marketplace_i1_1")
            .await
            .unwrap();
        let other = inventory
            .grant(&session(), &catalog, "main", &data, "marketplace_i2_1")
            .await
            .unwrap();

        assert_eq!(first.item_instance_id, retry.item_instance_id);
        assert_ne!(first.item_instance_id, other.item_instance_id);
        assert_eq!(inventory.grant_count(), 2);
    }

    #[tokio::test]
    async fn retract_removes_listing() {
        let inventory = InMemoryInventorySystem::new();
        let listed = inventory
            .list_for_sale(
                &session(),
                &ItemInstanceId::new("inst-1"),
                Price::new(100).unwrap(),
                &Description::empty(),
            )
            .await
            .unwrap();

        inventory
            .retract_listing(&session(), &listed.external_listing_id)
            .await
            .unwrap();
        assert_eq!(inventory.listing_count(), 0);

        let err = inventory
            .retract_listing(&session(), &listed.external_listing_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::RemoteRejected(_)));
    }

    #[tokio::test]
    async fn identity_lookup() {
        let inventory = InMemoryInventorySystem::new();
        inventory.register_identity("ticket-1", PlayerId::new("PF-9"));

        let player = inventory.fetch_session_identity(&session()).await.unwrap();
        assert_eq!(player, PlayerId::new("PF-9"));

        inventory.set_fail_identity_fetch(true);
        let err = inventory
            .fetch_session_identity(&session())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::RemoteUnavailable(_)));
    }

    #[tokio::test]
    async fn offline_fails_everything() {
        let inventory = InMemoryInventorySystem::new();
        inventory.set_offline(true);

        let err = inventory
            .list_for_sale(
                &session(),
                &ItemInstanceId::new("inst-1"),
                Price::new(100).unwrap(),
                &Description::empty(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::RemoteUnavailable(_)));
    }
}
