use std::time::Duration;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::Response,
};

use mercato_auth::Principal;
use mercato_core::RequestContext;

use crate::app::errors::json_error;

/// Deadline applied to every authenticated request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RequestTimeout(pub Duration);

/// Per-request call context built from the authenticated principal.
///
/// The inner `RequestContext` carries the caller identity and the request
/// deadline. Client disconnects drop the handler future, which drops any
/// in-flight store call with it.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub ctx: RequestContext,
    pub principal: Principal,
}

#[async_trait]
impl<S> FromRequestParts<S> for CallContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "no authenticated caller"))?;

        let identity = principal
            .identity()
            .map_err(|e| json_error(StatusCode::UNAUTHORIZED, "unauthenticated", e.to_string()))?;

        let mut ctx = RequestContext::authenticated(identity);
        if let Some(RequestTimeout(timeout)) = parts.extensions.get::<RequestTimeout>().copied() {
            ctx = ctx.with_timeout(timeout);
        }

        Ok(Self { ctx, principal })
    }
}
