use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use tracing::instrument;

use mercato_core::OrderId;
use mercato_sales::{Order, OrderError};

use crate::app::dto::{CreateOrderRequest, OrderCreatedResponse};
use crate::app::errors::order_error_to_response;
use crate::app::services::AppServices;
use crate::context::CallContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order).put(update_order).delete(delete_order))
}

/// Place an order for the caller.
///
/// A committed order whose confirmation could not be sent is still `201`;
/// the `notification` field tells the client not to resubmit.
#[instrument(skip_all, fields(customer_id = %call.principal.customer_id, lines = body.items.len()))]
pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Json(body): Json<CreateOrderRequest>,
) -> axum::response::Response {
    match services.orders.create_order(&call.ctx, body.into_lines()).await {
        Ok(order) => (StatusCode::CREATED, Json(OrderCreatedResponse::delivered(order))).into_response(),
        Err(OrderError::NotificationFailed { order, cause }) => (
            StatusCode::CREATED,
            Json(OrderCreatedResponse::undelivered(*order, &cause)),
        )
            .into_response(),
        Err(e) => order_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
) -> axum::response::Response {
    match services.orders.list_orders(&call.ctx).await {
        Ok(orders) => Json(orders).into_response(),
        Err(e) => order_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Path(id): Path<OrderId>,
) -> axum::response::Response {
    match services.orders.get_order(&call.ctx, id).await {
        Ok(order) => Json(order).into_response(),
        Err(e) => order_error_to_response(e),
    }
}

/// Replace an order verbatim. The path id wins over any id in the body.
pub async fn update_order(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Path(id): Path<OrderId>,
    Json(mut order): Json<Order>,
) -> axum::response::Response {
    order.id = id;
    match services.orders.update_order(&call.ctx, order).await {
        Ok(order) => Json(order).into_response(),
        Err(e) => order_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Path(id): Path<OrderId>,
) -> axum::response::Response {
    match services.orders.delete_order(&call.ctx, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => order_error_to_response(e),
    }
}
