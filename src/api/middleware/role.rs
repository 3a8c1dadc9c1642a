//! Caller role extraction.
//!
//! Token validation happens upstream; by the time a request arrives here the
//! role is a plain string in `X-User-Role`. It is required on timeline routes.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::CallerRole;

pub const ROLE_HEADER: &str = "X-User-Role";

/// Require `X-User-Role` and inject it as `CallerRole`.
pub async fn require_role(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let role = req
        .headers()
        .get(ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    match role {
        Some(role) => {
            req.extensions_mut().insert(CallerRole(role));
            next.run(req).await
        }
        None => ApiError::RoleRequired.into_response(),
    }
}
