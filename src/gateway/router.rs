//! HTTP router and handlers

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderValue, Method, header},
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

use crate::auth::{self, Claims, ScopeSet, TokenVerifier};
use crate::config::CorsConfig;
use crate::mgmt::ManagementApi;
use crate::view::{self, ClientView};
use crate::Result;

/// Scopes required to reach the aggregation endpoint.
pub const AGGREGATION_SCOPES: [&str; 3] = ["read:actions", "read:clients", "read:triggers"];

/// Shared application state
pub struct AppState {
    /// Bearer-token verifier
    pub verifier: Arc<dyn TokenVerifier>,
    /// Management API client
    pub mgmt: Arc<dyn ManagementApi>,
}

/// Create the router
pub fn create_router(state: Arc<AppState>, cors: &CorsConfig) -> Router {
    let verifier = Arc::clone(&state.verifier);
    let scopes = Arc::new(ScopeSet::new(AGGREGATION_SCOPES));

    // authorize_scopes is a route_layer on the scoped route only, so it runs
    // inside (after) the authenticate layer applied below.
    let scoped = Router::new()
        .route("/api/private-scoped", get(private_scoped_handler))
        .route_layer(middleware::from_fn_with_state(
            scopes,
            auth::authorize_scopes,
        ));

    Router::new()
        .route("/api/private", get(private_handler))
        .merge(scoped)
        .route_layer(middleware::from_fn_with_state(
            verifier,
            auth::authenticate,
        ))
        .route("/api/public", get(public_handler))
        .layer(CatchPanicLayer::new())
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the CORS layer from the configured origins.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// GET /api/public handler - no authentication required
async fn public_handler() -> impl IntoResponse {
    Json(json!({
        "message":
            "Hello from a public endpoint! You don't need to be authenticated to see this.",
    }))
}

/// GET /api/private handler - any valid bearer token
async fn private_handler(Extension(claims): Extension<Claims>) -> impl IntoResponse {
    debug!(subject = %claims.sub, "Private endpoint");
    Json(json!({
        "message":
            "Hello from a private endpoint! You need to be authenticated to see this.",
    }))
}

/// GET /api/private-scoped handler - the full aggregation pipeline.
///
/// Reached only with a valid token carrying all of [`AGGREGATION_SCOPES`]:
/// acquires a service credential, fetches both collections concurrently,
/// and aggregates them under the caller's permissions.
async fn private_scoped_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ClientView>>> {
    let credential = state.mgmt.service_credential().await?;

    let (actions, clients) = tokio::try_join!(
        state.mgmt.fetch_actions(&credential),
        state.mgmt.fetch_clients(&credential),
    )?;

    let views = view::build_client_views(&clients, &actions, &claims)?;
    Ok(Json(views))
}
