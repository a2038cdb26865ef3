//! API error types with HTTP response mapping.

use adapters::AdapterError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use repair::RepairError;
use workflow::WorkflowError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Workflow execution error.
    Workflow(WorkflowError),
    /// Reconciliation run error.
    Repair(RepairError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Workflow(err) => workflow_error_to_response(err),
            ApiError::Repair(err) => {
                tracing::error!(error = %err, "reconciliation run failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn workflow_error_to_response(err: WorkflowError) -> (StatusCode, String) {
    match &err {
        WorkflowError::Validation(DomainError::InvalidPrice { .. })
        | WorkflowError::Validation(DomainError::DescriptionTooLong { .. })
        | WorkflowError::Validation(DomainError::InvalidStateTransition { .. })
        | WorkflowError::SelfPurchase => (StatusCode::BAD_REQUEST, err.to_string()),
        WorkflowError::ListingNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        WorkflowError::AlreadyPurchased(_) => (StatusCode::CONFLICT, err.to_string()),
        WorkflowError::NotOwner => (StatusCode::FORBIDDEN, err.to_string()),
        WorkflowError::PaymentFailed(_) => (StatusCode::PAYMENT_REQUIRED, err.to_string()),
        WorkflowError::Adapter(AdapterError::RemoteRejected(_)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        WorkflowError::Adapter(AdapterError::RemoteUnavailable(_))
        | WorkflowError::MissingExternalId => (StatusCode::BAD_GATEWAY, err.to_string()),
        WorkflowError::Adapter(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::Workflow(err)
    }
}

impl From<RepairError> for ApiError {
    fn from(err: RepairError) -> Self {
        ApiError::Repair(err)
    }
}
