//! Timeline API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.

use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::timeline::TimelineEngine;

/// Build the timeline API router.
///
/// `allowed_origins` feeds the CORS policy; origins that are not valid
/// header values are skipped with a warning.
pub fn timeline_api_router(engine: TimelineEngine, allowed_origins: &[String]) -> Router {
    build_router(ApiContext::new(engine), allowed_origins)
}

fn build_router(ctx: ApiContext, allowed_origins: &[String]) -> Router {
    // Role-bearing routes: X-User-Role is required
    let clinical = Router::new()
        .route("/timeline", get(endpoints::timeline::get_timeline))
        .with_state(ctx)
        .route_layer(axum::middleware::from_fn(middleware::role::require_role));

    let open = Router::new().route("/health", get(endpoints::health::check));

    Router::new()
        .nest("/api", clinical.merge(open))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::audit::log_access))
                .layer(cors_layer(allowed_origins)),
        )
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
        .allow_headers([HeaderName::from_static("x-user-role")])
}
