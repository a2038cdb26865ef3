//! Listing store adapter trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ListingId;
use domain::{Listing, ListingPatch};
use tokio::sync::RwLock;

use crate::error::AdapterError;

/// Hard upper bound on operations per batch commit, matching the
/// document store's batch write limit.
pub const MAX_BATCH_OPS: usize = 500;

/// One operation inside a batch commit.
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Patch an existing row.
    Update(ListingId, ListingPatch),
    /// Delete a row.
    Delete(ListingId),
}

/// The external document database holding listing metadata.
///
/// Every write is a single-document operation; `apply_batch` commits
/// up to [`MAX_BATCH_OPS`] operations atomically, but batches are
/// independent commits with no transaction spanning them — the root
/// cause the reconciliation service exists for.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Creates a listing document and returns its assigned id.
    async fn create(&self, listing: Listing) -> Result<ListingId, AdapterError>;

    /// Loads a listing by id.
    async fn get(&self, id: &ListingId) -> Result<Option<Listing>, AdapterError>;

    /// Applies a partial update to an existing row.
    async fn update(&self, id: &ListingId, patch: ListingPatch) -> Result<(), AdapterError>;

    /// Deletes a row.
    async fn delete(&self, id: &ListingId) -> Result<(), AdapterError>;

    /// The browse query: rows with `purchased == false`, newest first.
    async fn query_available(&self) -> Result<Vec<(ListingId, Listing)>, AdapterError>;

    /// Full scan for the reconciliation service.
    async fn scan_all(&self) -> Result<Vec<(ListingId, Listing)>, AdapterError>;

    /// Commits a batch of at most [`MAX_BATCH_OPS`] operations
    /// atomically and returns the number applied.
    async fn apply_batch(&self, ops: Vec<BatchOp>) -> Result<usize, AdapterError>;
}

#[derive(Debug, Default)]
struct InMemoryStoreState {
    rows: HashMap<ListingId, Listing>,
    write_count: usize,
    batch_commits: usize,
    fail_on_create: bool,
    fail_on_write: bool,
}

/// In-memory listing store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryListingStore {
    state: Arc<RwLock<InMemoryStoreState>>,
}

impl InMemoryListingStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures create calls to fail.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Configures update/delete/batch calls to fail.
    pub async fn set_fail_on_write(&self, fail: bool) {
        self.state.write().await.fail_on_write = fail;
    }

    /// Number of rows currently stored.
    pub async fn row_count(&self) -> usize {
        self.state.read().await.rows.len()
    }

    /// Total single-document writes performed (creates, updates, deletes,
    /// and individual batch operations).
    pub async fn write_count(&self) -> usize {
        self.state.read().await.write_count
    }

    /// Number of batch commits performed.
    pub async fn batch_commit_count(&self) -> usize {
        self.state.read().await.batch_commits
    }
}

#[async_trait]
impl ListingStore for InMemoryListingStore {
    async fn create(&self, listing: Listing) -> Result<ListingId, AdapterError> {
        let mut state = self.state.write().await;
        if state.fail_on_create {
            return Err(AdapterError::RemoteUnavailable(
                "listing store unreachable".to_string(),
            ));
        }
        let id = ListingId::generate();
        state.rows.insert(id.clone(), listing);
        state.write_count += 1;
        Ok(id)
    }

    async fn get(&self, id: &ListingId) -> Result<Option<Listing>, AdapterError> {
        Ok(self.state.read().await.rows.get(id).cloned())
    }

    async fn update(&self, id: &ListingId, patch: ListingPatch) -> Result<(), AdapterError> {
        let mut state = self.state.write().await;
        if state.fail_on_write {
            return Err(AdapterError::RemoteUnavailable(
                "listing store unreachable".to_string(),
            ));
        }
        let row = state
            .rows
            .get_mut(id)
            .ok_or_else(|| AdapterError::NotFound(id.clone()))?;
        patch.apply_to(row);
        state.write_count += 1;
        Ok(())
    }

    async fn delete(&self, id: &ListingId) -> Result<(), AdapterError> {
        let mut state = self.state.write().await;
        if state.fail_on_write {
            return Err(AdapterError::RemoteUnavailable(
                "listing store unreachable".to_string(),
            ));
        }
        state
            .rows
            .remove(id)
            .ok_or_else(|| AdapterError::NotFound(id.clone()))?;
        state.write_count += 1;
        Ok(())
    }

    async fn query_available(&self) -> Result<Vec<(ListingId, Listing)>, AdapterError> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .rows
            .iter()
            .filter(|(_, listing)| !listing.purchased)
            .map(|(id, listing)| (id.clone(), listing.clone()))
            .collect();
        rows.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(rows)
    }

    async fn scan_all(&self) -> Result<Vec<(ListingId, Listing)>, AdapterError> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .rows
            .iter()
            .map(|(id, listing)| (id.clone(), listing.clone()))
            .collect();
        rows.sort_by(|a, b| a.1.created_at.cmp(&b.1.created_at));
        Ok(rows)
    }

    async fn apply_batch(&self, ops: Vec<BatchOp>) -> Result<usize, AdapterError> {
        if ops.len() > MAX_BATCH_OPS {
            return Err(AdapterError::BatchTooLarge {
                len: ops.len(),
                max: MAX_BATCH_OPS,
            });
        }

        let mut state = self.state.write().await;
        if state.fail_on_write {
            return Err(AdapterError::RemoteUnavailable(
                "listing store unreachable".to_string(),
            ));
        }

        // Validate the whole batch first; a batch commit is atomic.
        for op in &ops {
            let id = match op {
                BatchOp::Update(id, _) | BatchOp::Delete(id) => id,
            };
            if !state.rows.contains_key(id) {
                return Err(AdapterError::NotFound(id.clone()));
            }
        }

        let applied = ops.len();
        for op in ops {
            match op {
                BatchOp::Update(id, patch) => {
                    if let Some(row) = state.rows.get_mut(&id) {
                        patch.apply_to(row);
                    }
                }
                BatchOp::Delete(id) => {
                    state.rows.remove(&id);
                }
            }
            state.write_count += 1;
        }
        state.batch_commits += 1;
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CatalogItemId, ItemInstanceId, UserId};
    use domain::{Description, InventoryItem, PaymentMethod, Price, SessionContext};

    fn listing(instance: &str) -> Listing {
        let item = InventoryItem {
            item_instance_id: ItemInstanceId::new(instance),
            item_id: CatalogItemId::new("sword_01"),
            catalog_version: None,
            display_name: None,
            custom_data: None,
            remaining_uses: None,
        };
        let seller = SessionContext::new(UserId::new("seller"), None, "t1");
        Listing::from_sale(
            &item,
            Price::new(1000).unwrap(),
            Description::empty(),
            &seller,
            format!("marketplace_{instance}_1"),
            None,
        )
    }

    #[tokio::test]
    async fn create_get_update_delete() {
        let store = InMemoryListingStore::new();
        let id = store.create(listing("i1")).await.unwrap();

        let row = store.get(&id).await.unwrap().unwrap();
        assert!(row.is_available());

        store
            .update(
                &id,
                ListingPatch::sold_to(UserId::new("buyer"), PaymentMethod::Mock),
            )
            .await
            .unwrap();
        let row = store.get(&id).await.unwrap().unwrap();
        assert!(row.purchased);
        assert!(!row.is_active);

        store.delete(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_row_is_not_found() {
        let store = InMemoryListingStore::new();
        let err = store
            .update(&ListingId::new("nope"), ListingPatch::granted())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::NotFound(_)));
    }

    #[tokio::test]
    async fn browse_query_excludes_purchased_rows() {
        let store = InMemoryListingStore::new();
        let id1 = store.create(listing("i1")).await.unwrap();
        let _id2 = store.create(listing("i2")).await.unwrap();

        store
            .update(
                &id1,
                ListingPatch::sold_to(UserId::new("buyer"), PaymentMethod::Mock),
            )
            .await
            .unwrap();

        let available = store.query_available().await.unwrap();
        assert_eq!(available.len(), 1);
        assert!(available.iter().all(|(_, l)| !l.purchased && l.is_active));
    }

    #[tokio::test]
    async fn batch_over_limit_rejected() {
        let store = InMemoryListingStore::new();
        let id = store.create(listing("i1")).await.unwrap();

        let ops: Vec<BatchOp> = (0..=MAX_BATCH_OPS)
            .map(|_| BatchOp::Update(id.clone(), ListingPatch::granted()))
            .collect();
        let err = store.apply_batch(ops).await.unwrap_err();
        assert!(matches!(err, AdapterError::BatchTooLarge { len: 501, .. }));
        assert_eq!(store.batch_commit_count().await, 0);
    }

    #[tokio::test]
    async fn batch_commit_applies_all_ops() {
        let store = InMemoryListingStore::new();
        let id1 = store.create(listing("i1")).await.unwrap();
        let id2 = store.create(listing("i2")).await.unwrap();

        let applied = store
            .apply_batch(vec![
                BatchOp::Update(id1.clone(), ListingPatch::normalized_flags(false)),
                BatchOp::Delete(id2.clone()),
            ])
            .await
            .unwrap();

        assert_eq!(applied, 2);
        assert_eq!(store.batch_commit_count().await, 1);
        assert!(store.get(&id2).await.unwrap().is_none());
    }
}
