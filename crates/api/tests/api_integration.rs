//! Integration tests for the API server.

use std::sync::Arc;
use std::sync::OnceLock;

use adapters::{InMemoryInventorySystem, InMemoryListingStore, InMemoryPaymentProcessor};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::SessionId;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

type State = Arc<
    api::routes::listings::AppState<
        InMemoryInventorySystem,
        InMemoryListingStore,
        InMemoryPaymentProcessor,
    >,
>;

fn setup() -> (axum::Router, State) {
    let state = api::create_default_state();
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

fn seller_session() -> serde_json::Value {
    serde_json::json!({
        "uid": "seller-1",
        "email": "seller@example.com",
        "session_ticket": "t-seller"
    })
}

fn buyer_session() -> serde_json::Value {
    serde_json::json!({
        "uid": "buyer-1",
        "session_ticket": "t-buyer"
    })
}

fn create_listing_body(instance: &str, price: i64) -> String {
    serde_json::json!({
        "session": seller_session(),
        "item": {
            "itemInstanceId": instance,
            "itemId": "sword_01",
            "displayName": "Iron Sword"
        },
        "price": price,
        "description": "barely used"
    })
    .to_string()
}

async fn post_json(app: &axum::Router, uri: &str, body: String) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();
    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_and_browse_listing() {
    let (app, _) = setup();

    let (status, created) = post_json(&app, "/listings", create_listing_body("inst-1", 1500)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["listing_id"].as_str().is_some());
    assert!(
        created["external_listing_id"]
            .as_str()
            .unwrap()
            .starts_with("marketplace_inst-1_")
    );

    let (status, listings) = get_json(&app, "/listings").await;
    assert_eq!(status, StatusCode::OK);
    let rows = listings.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "Iron Sword");
    assert_eq!(rows[0]["price"], 1500);
    assert_eq!(rows[0]["isActive"], true);
    assert_eq!(rows[0]["purchased"], false);
}

#[tokio::test]
async fn test_invalid_price_is_bad_request() {
    let (app, _) = setup();
    let (status, json) = post_json(&app, "/listings", create_listing_body("inst-1", 0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_get_missing_listing_is_not_found() {
    let (app, _) = setup();
    let (status, _) = get_json(&app, "/listings/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mock_purchase_removes_listing_from_browse() {
    let (app, _) = setup();
    let (_, created) = post_json(&app, "/listings", create_listing_body("inst-1", 1000)).await;
    let listing_id = created["listing_id"].as_str().unwrap().to_string();

    let body = serde_json::json!({
        "session": buyer_session(),
        "payment_method": "mock"
    })
    .to_string();
    let (status, outcome) = post_json(&app, &format!("/listings/{listing_id}/purchase"), body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "granted");
    assert!(
        outcome["item_instance_id"]
            .as_str()
            .unwrap()
            .starts_with("ITEM-")
    );

    let (_, listings) = get_json(&app, "/listings").await;
    assert!(listings.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_self_purchase_rejected() {
    let (app, _) = setup();
    let (_, created) = post_json(&app, "/listings", create_listing_body("inst-1", 1000)).await;
    let listing_id = created["listing_id"].as_str().unwrap().to_string();

    let body = serde_json::json!({
        "session": seller_session(),
        "payment_method": "mock"
    })
    .to_string();
    let (status, _) = post_json(&app, &format!("/listings/{listing_id}/purchase"), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_purchase_and_confirmation() {
    let (app, state) = setup();
    let (_, created) = post_json(&app, "/listings", create_listing_body("inst-1", 2000)).await;
    let listing_id = created["listing_id"].as_str().unwrap().to_string();

    let body = serde_json::json!({
        "session": buyer_session(),
        "payment_method": "processor"
    })
    .to_string();
    let (status, outcome) = post_json(&app, &format!("/listings/{listing_id}/purchase"), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "redirect_to_checkout");
    let session_id = outcome["session_id"].as_str().unwrap().to_string();
    assert!(outcome["checkout_url"].as_str().unwrap().starts_with("https://"));

    // Simulate the processor settling the session off to the side.
    state.payment.complete_session(&SessionId::new(session_id.clone()));

    let body = serde_json::json!({
        "session": buyer_session(),
        "session_id": session_id
    })
    .to_string();
    let (status, confirmed) =
        post_json(&app, &format!("/listings/{listing_id}/confirm"), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["outcome"], "completed");

    let (status, row) = get_json(&app, &format!("/listings/{listing_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(row["purchased"], true);
    assert_eq!(row["paymentMethod"], "processor");
}

#[tokio::test]
async fn test_cancel_requires_ownership() {
    let (app, _) = setup();
    let (_, created) = post_json(&app, "/listings", create_listing_body("inst-1", 1000)).await;
    let listing_id = created["listing_id"].as_str().unwrap().to_string();

    let body = serde_json::json!({ "session": buyer_session() }).to_string();
    let (status, _) = post_json(&app, &format!("/listings/{listing_id}/cancel"), body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let body = serde_json::json!({ "session": seller_session() }).to_string();
    let (status, _) = post_json(&app, &format!("/listings/{listing_id}/cancel"), body).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get_json(&app, &format!("/listings/{listing_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_repair_sweeps_completed_sales() {
    let (app, _) = setup();
    let (_, created) = post_json(&app, "/listings", create_listing_body("inst-1", 1000)).await;
    let listing_id = created["listing_id"].as_str().unwrap().to_string();

    let body = serde_json::json!({
        "session": buyer_session(),
        "payment_method": "mock"
    })
    .to_string();
    post_json(&app, &format!("/listings/{listing_id}/purchase"), body).await;

    let (status, report) = post_json(&app, "/repair", String::from("")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["scanned"], 1);
    assert_eq!(report["deleted"], 1);
    assert_eq!(report["failed"], 0);

    let (status, _) = get_json(&app, &format!("/listings/{listing_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
