use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use mercato_catalog::CatalogError;
use mercato_core::{Interrupted, StoreError};
use mercato_parties::CustomerError;
use mercato_sales::OrderError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Unavailable(msg) => {
            error!(error = %msg, "store unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "persistence_failure", msg)
        }
        StoreError::Rejected(msg) => {
            error!(error = %msg, "store rejected operation");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "persistence_failure", msg)
        }
    }
}

fn interrupted_to_response(err: Interrupted) -> axum::response::Response {
    match err {
        Interrupted::DeadlineExceeded => {
            json_error(StatusCode::GATEWAY_TIMEOUT, "deadline_exceeded", err.to_string())
        }
        Interrupted::Cancelled => json_error(StatusCode::SERVICE_UNAVAILABLE, "cancelled", err.to_string()),
    }
}

/// `NotificationFailed` is not an error response; handlers map it to `201`.
pub fn order_error_to_response(err: OrderError) -> axum::response::Response {
    match err {
        OrderError::Unauthenticated => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "unauthenticated")
        }
        OrderError::EmptyOrder => json_error(StatusCode::BAD_REQUEST, "empty_order", err.to_string()),
        OrderError::InvalidQuantity { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_quantity", err.to_string())
        }
        OrderError::InvalidProduct(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_product", err.to_string())
        }
        OrderError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "order not found"),
        OrderError::Persistence(e) => store_error_to_response(e),
        OrderError::Cancelled(i) => interrupted_to_response(i),
        OrderError::NotificationFailed { .. } => {
            json_error(StatusCode::BAD_GATEWAY, "notification_failed", err.to_string())
        }
    }
}

pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    match err {
        CatalogError::Unauthenticated => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "unauthenticated")
        }
        CatalogError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        CatalogError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        CatalogError::UnknownCategory(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "unknown_category", err.to_string())
        }
        CatalogError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        CatalogError::EmptyCategory(_) => {
            json_error(StatusCode::NOT_FOUND, "empty_category", err.to_string())
        }
        CatalogError::Persistence(e) => store_error_to_response(e),
        CatalogError::Interrupted(i) => interrupted_to_response(i),
    }
}

pub fn customer_error_to_response(err: CustomerError) -> axum::response::Response {
    match err {
        CustomerError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        CustomerError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "customer not found"),
        CustomerError::Persistence(e) => store_error_to_response(e),
        CustomerError::Interrupted(i) => interrupted_to_response(i),
    }
}
