//! Authentication and authorization middleware.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::scopes::ScopeSet;
use super::validator::{AuthError, Claims, TokenVerifier};
use crate::Error;

/// Verify the bearer token and attach [`Claims`] to the request.
pub async fn authenticate(
    State(verifier): State<Arc<dyn TokenVerifier>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
        });

    let Some(token) = token else {
        return Error::Authentication(AuthError::MissingToken).into_response();
    };

    match verifier.verify(token).await {
        Ok(claims) => {
            debug!(subject = %claims.sub, path = %request.uri().path(), "Authenticated request");
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => Error::Authentication(e).into_response(),
    }
}

/// Require every scope in the route's [`ScopeSet`].
///
/// Must run after [`authenticate`]; a request without claims is rejected as
/// unauthenticated rather than crossing into the handler.
pub async fn authorize_scopes(
    State(required): State<Arc<ScopeSet>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(claims) = request.extensions().get::<Claims>() else {
        return Error::Authentication(AuthError::MissingToken).into_response();
    };

    let missing = required.missing(&claims.permissions);
    if !missing.is_empty() {
        return Error::Authorization { missing }.into_response();
    }

    next.run(request).await
}
