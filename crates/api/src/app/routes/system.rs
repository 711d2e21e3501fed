use axum::{http::StatusCode, Json};

use crate::app::dto::WhoAmIResponse;
use crate::context::CallContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(call: CallContext) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        customer_id: call.principal.customer_id,
        email: call.principal.email,
        email_verified: call.principal.email_verified,
    })
}
