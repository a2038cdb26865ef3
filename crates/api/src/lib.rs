//! HTTP API server with observability for the marketplace listing
//! system.
//!
//! Provides REST endpoints for the listing lifecycle and the
//! reconciliation procedures, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use adapters::{
    InMemoryInventorySystem, InMemoryListingStore, InMemoryPaymentProcessor, InventorySystem,
    ListingStore, PaymentProcessor,
};
use repair::Reconciler;
use workflow::ListingWorkflow;

use routes::listings::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<I, S, P>(state: Arc<AppState<I, S, P>>, metrics_handle: PrometheusHandle) -> Router
where
    I: InventorySystem + Clone + 'static,
    S: ListingStore + 'static,
    P: PaymentProcessor + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/listings", post(routes::listings::create::<I, S, P>))
        .route("/listings", get(routes::listings::list::<I, S, P>))
        .route("/listings/{id}", get(routes::listings::get::<I, S, P>))
        .route(
            "/listings/{id}/purchase",
            post(routes::listings::purchase::<I, S, P>),
        )
        .route(
            "/listings/{id}/confirm",
            post(routes::listings::confirm::<I, S, P>),
        )
        .route(
            "/listings/{id}/cancel",
            post(routes::listings::cancel::<I, S, P>),
        )
        .route("/repair", post(routes::repair::run_all::<I, S, P>))
        .route(
            "/repair/flags",
            post(routes::repair::normalize_flags::<I, S, P>),
        )
        .route(
            "/repair/external-ids",
            post(routes::repair::repair_external_ids::<I, S, P>),
        )
        .route(
            "/repair/sweep",
            post(routes::repair::sweep_purchased::<I, S, P>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over the in-memory adapters.
pub fn create_default_state()
-> Arc<AppState<InMemoryInventorySystem, InMemoryListingStore, InMemoryPaymentProcessor>> {
    let inventory = InMemoryInventorySystem::new();
    let store = InMemoryListingStore::new();
    let payment = InMemoryPaymentProcessor::new();

    let workflow = ListingWorkflow::new(inventory.clone(), store.clone(), payment.clone());
    let reconciler = Reconciler::new(store);

    Arc::new(AppState {
        workflow,
        inventory,
        payment,
        reconciler,
    })
}
