//! Reconciliation trigger endpoints.
//!
//! Each endpoint runs one repair procedure to completion and returns
//! its report. Runs are idempotent, so re-triggering is always safe.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use adapters::{InventorySystem, ListingStore, PaymentProcessor};
use repair::RepairReport;

use crate::error::ApiError;
use crate::routes::listings::AppState;

/// POST /repair/flags — restore the purchased/active flag invariant.
#[tracing::instrument(skip(state))]
pub async fn normalize_flags<I, S, P>(
    State(state): State<Arc<AppState<I, S, P>>>,
) -> Result<Json<RepairReport>, ApiError>
where
    I: InventorySystem + Clone + 'static,
    S: ListingStore + 'static,
    P: PaymentProcessor + Clone + 'static,
{
    Ok(Json(state.reconciler.normalize_flags().await?))
}

/// POST /repair/external-ids — replace missing or malformed external
/// listing ids.
#[tracing::instrument(skip(state))]
pub async fn repair_external_ids<I, S, P>(
    State(state): State<Arc<AppState<I, S, P>>>,
) -> Result<Json<RepairReport>, ApiError>
where
    I: InventorySystem + Clone + 'static,
    S: ListingStore + 'static,
    P: PaymentProcessor + Clone + 'static,
{
    Ok(Json(state.reconciler.repair_external_ids().await?))
}

/// POST /repair/sweep — delete completed sale documents.
#[tracing::instrument(skip(state))]
pub async fn sweep_purchased<I, S, P>(
    State(state): State<Arc<AppState<I, S, P>>>,
) -> Result<Json<RepairReport>, ApiError>
where
    I: InventorySystem + Clone + 'static,
    S: ListingStore + 'static,
    P: PaymentProcessor + Clone + 'static,
{
    Ok(Json(state.reconciler.sweep_purchased().await?))
}

/// POST /repair — run all three procedures in order.
#[tracing::instrument(skip(state))]
pub async fn run_all<I, S, P>(
    State(state): State<Arc<AppState<I, S, P>>>,
) -> Result<Json<RepairReport>, ApiError>
where
    I: InventorySystem + Clone + 'static,
    S: ListingStore + 'static,
    P: PaymentProcessor + Clone + 'static,
{
    Ok(Json(state.reconciler.run_all().await?))
}
