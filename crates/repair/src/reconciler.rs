//! The reconciliation procedures.
//!
//! Each procedure is a full scan followed by chunked batch commits.
//! Runs are idempotent: a row already satisfying the invariant is
//! never written, so a second run over a clean store commits nothing.

use adapters::{BatchOp, ListingStore, MAX_BATCH_OPS};
use common::ListingId;
use domain::{LISTING_ID_PREFIX, Listing, ListingPatch, ListingState};
use serde::Serialize;

use crate::error::{RepairError, Result};

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Rows examined.
    pub scanned: usize,
    /// Rows patched.
    pub updated: usize,
    /// Rows deleted.
    pub deleted: usize,
    /// Rows whose repair was skipped because a batch commit failed.
    pub failed: usize,
    /// Batch commits performed.
    pub batches: usize,
}

/// Runs the batch repair procedures against a listing store.
///
/// The store's batch commits cap at [`MAX_BATCH_OPS`] operations, so a
/// run over a large store is a sequence of independent commits; a
/// commit that fails is logged, counted, and skipped, and the
/// remaining batches still run. Re-running after a partial failure
/// picks up exactly the rows that were missed.
pub struct Reconciler<S> {
    store: S,
}

impl<S: ListingStore> Reconciler<S> {
    /// Creates a reconciler over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Restores the `is_active == !purchased` invariant on every row.
    #[tracing::instrument(skip(self))]
    pub async fn normalize_flags(&self) -> Result<RepairReport> {
        let rows = self.scan().await?;
        let mut report = RepairReport {
            scanned: rows.len(),
            ..RepairReport::default()
        };

        let ops: Vec<BatchOp> = rows
            .iter()
            .filter(|(_, listing)| !listing.flags_consistent())
            .map(|(id, listing)| {
                tracing::debug!(%id, purchased = listing.purchased, is_active = listing.is_active, "flag divergence");
                BatchOp::Update(id.clone(), ListingPatch::normalized_flags(listing.purchased))
            })
            .collect();

        self.commit(ops, &mut report).await;
        metrics::counter!("repair_flags_normalized_total").increment(report.updated as u64);
        tracing::info!(scanned = report.scanned, updated = report.updated, failed = report.failed, "flag normalization finished");
        Ok(report)
    }

    /// Replaces missing or malformed external listing ids.
    ///
    /// The replacement follows the inventory system's naming
    /// convention and is derived from the row itself, so repeated runs
    /// mint the same id instead of churning the row.
    #[tracing::instrument(skip(self))]
    pub async fn repair_external_ids(&self) -> Result<RepairReport> {
        let rows = self.scan().await?;
        let mut report = RepairReport {
            scanned: rows.len(),
            ..RepairReport::default()
        };

        let ops: Vec<BatchOp> = rows
            .iter()
            .filter(|(_, listing)| !listing.has_well_formed_external_id())
            .map(|(id, listing)| {
                let replacement = replacement_external_id(listing);
                tracing::warn!(%id, old = ?listing.external_listing_id, new = %replacement, "repairing external listing id");
                BatchOp::Update(id.clone(), ListingPatch::replace_external_id(replacement))
            })
            .collect();

        self.commit(ops, &mut report).await;
        metrics::counter!("repair_external_ids_total").increment(report.updated as u64);
        tracing::info!(scanned = report.scanned, updated = report.updated, failed = report.failed, "external id repair finished");
        Ok(report)
    }

    /// Deletes rows whose sale has fully completed.
    ///
    /// Rows parked in `FailedGrant` are purchased but unresolved;
    /// deleting them would erase the only record of a paid-but-ungranted
    /// sale, so the sweep leaves them alone.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_purchased(&self) -> Result<RepairReport> {
        let rows = self.scan().await?;
        let mut report = RepairReport {
            scanned: rows.len(),
            ..RepairReport::default()
        };

        let ops: Vec<BatchOp> = rows
            .iter()
            .filter(|(_, listing)| listing.purchased && listing.state != ListingState::FailedGrant)
            .map(|(id, _)| BatchOp::Delete(id.clone()))
            .collect();

        self.commit(ops, &mut report).await;
        report.deleted = report.updated;
        report.updated = 0;
        metrics::counter!("repair_rows_swept_total").increment(report.deleted as u64);
        tracing::info!(scanned = report.scanned, deleted = report.deleted, failed = report.failed, "purchased row sweep finished");
        Ok(report)
    }

    /// Runs all three procedures in order and merges the reports.
    ///
    /// Flags first so the sweep sees honest `purchased` values, ids
    /// second, sweep last.
    pub async fn run_all(&self) -> Result<RepairReport> {
        let flags = self.normalize_flags().await?;
        let ids = self.repair_external_ids().await?;
        let sweep = self.sweep_purchased().await?;
        Ok(RepairReport {
            scanned: flags.scanned,
            updated: flags.updated + ids.updated,
            deleted: sweep.deleted,
            failed: flags.failed + ids.failed + sweep.failed,
            batches: flags.batches + ids.batches + sweep.batches,
        })
    }

    async fn scan(&self) -> Result<Vec<(ListingId, Listing)>> {
        self.store.scan_all().await.map_err(RepairError::Scan)
    }

    /// Commits `ops` in chunks under the batch limit. A failed chunk is
    /// counted and skipped; later chunks still commit.
    async fn commit(&self, ops: Vec<BatchOp>, report: &mut RepairReport) {
        for chunk in ops.chunks(MAX_BATCH_OPS) {
            match self.store.apply_batch(chunk.to_vec()).await {
                Ok(applied) => {
                    report.updated += applied;
                    report.batches += 1;
                }
                Err(e) => {
                    report.failed += chunk.len();
                    tracing::warn!(error = %e, rows = chunk.len(), "batch commit failed, continuing with remaining batches");
                }
            }
        }
    }
}

/// Derives the deterministic replacement id for a row with a missing
/// or malformed external listing id.
fn replacement_external_id(listing: &Listing) -> String {
    format!(
        "{LISTING_ID_PREFIX}{}_{}",
        listing.external_item_id,
        listing.created_at.timestamp_millis()
    )
}
