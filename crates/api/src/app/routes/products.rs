use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use mercato_catalog::{NewProduct, ProductChanges};
use mercato_core::ProductId;

use crate::app::dto::CreateProductRequest;
use crate::app::errors::catalog_error_to_response;
use crate::app::services::AppServices;
use crate::context::CallContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Json(body): Json<CreateProductRequest>,
) -> axum::response::Response {
    let new = NewProduct {
        name: body.name,
        price: body.price,
        category_id: body.category_id,
    };

    match services.catalog.create_product(&call.ctx, new).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
) -> axum::response::Response {
    match services.catalog.list_products(&call.ctx).await {
        Ok(products) => Json(products).into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Path(id): Path<ProductId>,
) -> axum::response::Response {
    match services.catalog.get_product(&call.ctx, id).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

/// Partial update; absent fields are left unchanged.
pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Path(id): Path<ProductId>,
    Json(changes): Json<ProductChanges>,
) -> axum::response::Response {
    match services.catalog.update_product(&call.ctx, id, changes).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Path(id): Path<ProductId>,
) -> axum::response::Response {
    match services.catalog.delete_product(&call.ctx, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}
