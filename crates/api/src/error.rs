//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No usable caller identity on the request.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout workflow error.
    Checkout(CheckoutError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    let status = match &err {
        CheckoutError::Validation(_)
        | CheckoutError::EmptyCart
        | CheckoutError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
        CheckoutError::InvalidTransition { .. } | CheckoutError::Conflict(_) => {
            StatusCode::CONFLICT
        }
        CheckoutError::NotAuthorized(_) => StatusCode::FORBIDDEN,
        CheckoutError::ProductNotFound(_)
        | CheckoutError::OrderNotFound(_)
        | CheckoutError::CartNotFound(_)
        | CheckoutError::CartLineNotFound(_) => StatusCode::NOT_FOUND,
        CheckoutError::Store(store_err) => {
            tracing::error!(error = %store_err, "storage failure");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            );
        }
    };
    (status, err.to_string())
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}
