use std::sync::Arc;

use axum::{
    extract::Extension,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use mercato_parties::CustomerProfile;

use crate::app::dto::UpsertProfileRequest;
use crate::app::errors::customer_error_to_response;
use crate::app::services::AppServices;
use crate::context::CallContext;

pub fn router() -> Router {
    Router::new().route("/me", get(get_me).put(upsert_me))
}

/// Create or refresh the caller's profile, keyed by the token's email.
pub async fn upsert_me(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
    Json(body): Json<UpsertProfileRequest>,
) -> axum::response::Response {
    let profile = CustomerProfile {
        name: body.name,
        email: call.principal.email.clone(),
        verified_email: call.principal.email_verified,
        phone: body.phone,
        picture: body.picture,
    };

    match services.customers.upsert(&call.ctx, profile).await {
        Ok(customer) => Json(customer).into_response(),
        Err(e) => customer_error_to_response(e),
    }
}

pub async fn get_me(
    Extension(services): Extension<Arc<AppServices>>,
    call: CallContext,
) -> axum::response::Response {
    match services
        .customers
        .find_by_email(&call.ctx, &call.principal.email)
        .await
    {
        Ok(customer) => Json(customer).into_response(),
        Err(e) => customer_error_to_response(e),
    }
}
