//! Listing lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{ListingId, SessionId, UserId};
use domain::{InventoryItem, Listing, PaymentMethod, SessionContext};
use serde::{Deserialize, Serialize};

use adapters::{InventorySystem, ListingStore, PaymentProcessor};
use repair::Reconciler;
use workflow::{
    CancelOutcome, CheckoutStrategy, ConfirmOutcome, ListOutcome, ListingWorkflow, MockStrategy,
    PurchaseOutcome,
};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
///
/// The inventory and payment handles are kept alongside the workflow
/// so purchase handlers can build the settlement strategy the request
/// asked for.
pub struct AppState<I: InventorySystem, S: ListingStore, P: PaymentProcessor> {
    pub workflow: ListingWorkflow<I, S, P>,
    pub inventory: I,
    pub payment: P,
    pub reconciler: Reconciler<S>,
}

// -- Request types --

/// Caller identity carried explicitly on every request.
#[derive(Deserialize)]
pub struct SessionRequest {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    pub session_ticket: String,
}

impl SessionRequest {
    fn into_context(self) -> SessionContext {
        SessionContext::new(UserId::new(self.uid), self.email, self.session_ticket)
    }
}

#[derive(Deserialize)]
pub struct CreateListingRequest {
    pub session: SessionRequest,
    pub item: InventoryItem,
    pub price: i64,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct PurchaseRequest {
    pub session: SessionRequest,
    pub payment_method: PaymentMethod,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub session: SessionRequest,
    pub session_id: String,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub session: SessionRequest,
}

// -- Response types --

#[derive(Serialize)]
pub struct ListingResponse {
    pub id: ListingId,
    #[serde(flatten)]
    pub listing: Listing,
}

// -- Handlers --

/// POST /listings — put an inventory item up for sale.
#[tracing::instrument(skip(state, req))]
pub async fn create<I, S, P>(
    State(state): State<Arc<AppState<I, S, P>>>,
    Json(req): Json<CreateListingRequest>,
) -> Result<(axum::http::StatusCode, Json<ListOutcome>), ApiError>
where
    I: InventorySystem + Clone + 'static,
    S: ListingStore + 'static,
    P: PaymentProcessor + Clone + 'static,
{
    let seller = req.session.into_context();
    let outcome = state
        .workflow
        .list(&seller, &req.item, req.price, &req.description)
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(outcome)))
}

/// GET /listings — browse available listings, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<I, S, P>(
    State(state): State<Arc<AppState<I, S, P>>>,
) -> Result<Json<Vec<ListingResponse>>, ApiError>
where
    I: InventorySystem + Clone + 'static,
    S: ListingStore + 'static,
    P: PaymentProcessor + Clone + 'static,
{
    let rows = state.workflow.browse().await?;
    let responses = rows
        .into_iter()
        .map(|(id, listing)| ListingResponse { id, listing })
        .collect();
    Ok(Json(responses))
}

/// GET /listings/:id — load a single listing.
#[tracing::instrument(skip(state))]
pub async fn get<I, S, P>(
    State(state): State<Arc<AppState<I, S, P>>>,
    Path(id): Path<String>,
) -> Result<Json<ListingResponse>, ApiError>
where
    I: InventorySystem + Clone + 'static,
    S: ListingStore + 'static,
    P: PaymentProcessor + Clone + 'static,
{
    let listing_id = ListingId::new(id);
    let listing = state
        .workflow
        .get(&listing_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("listing {listing_id} not found")))?;
    Ok(Json(ListingResponse {
        id: listing_id,
        listing,
    }))
}

/// POST /listings/:id/purchase — settle a purchase on the requested
/// payment path.
#[tracing::instrument(skip(state, req))]
pub async fn purchase<I, S, P>(
    State(state): State<Arc<AppState<I, S, P>>>,
    Path(id): Path<String>,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<PurchaseOutcome>, ApiError>
where
    I: InventorySystem + Clone + 'static,
    S: ListingStore + 'static,
    P: PaymentProcessor + Clone + 'static,
{
    let listing_id = ListingId::new(id);
    let buyer = req.session.into_context();

    let outcome = match req.payment_method {
        PaymentMethod::Processor => {
            let strategy = CheckoutStrategy::new(state.payment.clone());
            state.workflow.purchase(&buyer, &listing_id, &strategy).await?
        }
        PaymentMethod::Mock => {
            let strategy = MockStrategy::new(state.inventory.clone());
            state.workflow.purchase(&buyer, &listing_id, &strategy).await?
        }
    };
    Ok(Json(outcome))
}

/// POST /listings/:id/confirm — confirm a processor-path purchase
/// after redirect return.
#[tracing::instrument(skip(state, req))]
pub async fn confirm<I, S, P>(
    State(state): State<Arc<AppState<I, S, P>>>,
    Path(id): Path<String>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ConfirmOutcome>, ApiError>
where
    I: InventorySystem + Clone + 'static,
    S: ListingStore + 'static,
    P: PaymentProcessor + Clone + 'static,
{
    let listing_id = ListingId::new(id);
    let buyer = req.session.into_context();
    let session_id = SessionId::new(req.session_id);

    let outcome = state
        .workflow
        .confirm_payment(&buyer, &listing_id, &session_id)
        .await?;
    Ok(Json(outcome))
}

/// POST /listings/:id/cancel — retract and remove an unsold listing.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<I, S, P>(
    State(state): State<Arc<AppState<I, S, P>>>,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<CancelOutcome>, ApiError>
where
    I: InventorySystem + Clone + 'static,
    S: ListingStore + 'static,
    P: PaymentProcessor + Clone + 'static,
{
    let listing_id = ListingId::new(id);
    let owner = req.session.into_context();
    let outcome = state.workflow.cancel(&owner, &listing_id).await?;
    Ok(Json(outcome))
}
