use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use tracing::instrument;

use mercato_core::CategoryId;

use crate::app::dto::{AveragePriceResponse, CategoryNameRequest};
use crate::app::errors::catalog_error_to_response;
use crate::app::services::AppServices;
use crate::context::CallContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category).put(rename_category).delete(delete_category),
        )
        .route("/:id/average-price", get(average_price))
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Json(body): Json<CategoryNameRequest>,
) -> axum::response::Response {
    match services.catalog.create_category(&call.ctx, body.name).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
) -> axum::response::Response {
    match services.catalog.list_categories(&call.ctx).await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Path(id): Path<CategoryId>,
) -> axum::response::Response {
    match services.catalog.get_category(&call.ctx, id).await {
        Ok(category) => Json(category).into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

pub async fn rename_category(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Path(id): Path<CategoryId>,
    Json(body): Json<CategoryNameRequest>,
) -> axum::response::Response {
    match services.catalog.rename_category(&call.ctx, id, body.name).await {
        Ok(category) => Json(category).into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Path(id): Path<CategoryId>,
) -> axum::response::Response {
    match services.catalog.delete_category(&call.ctx, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

/// Mean price of the products in a category.
#[instrument(skip(services, call))]
pub async fn average_price(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Path(id): Path<CategoryId>,
) -> axum::response::Response {
    match services.aggregator.average_price(&call.ctx, id).await {
        Ok(average_price) => Json(AveragePriceResponse {
            category_id: id,
            average_price,
        })
        .into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}
