//! Authentication middleware: access token extraction and verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tessera_core::models::auth::AccessClaims;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies;

/// Verified access claims, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedProfile(pub AccessClaims);

/// Axum middleware: takes the access token from `Authorization: Bearer` or,
/// failing that, the access cookie, verifies it and injects
/// `AuthenticatedProfile` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = match request.headers().get(AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string)
            .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?,
        None => cookies::access_token(&CookieJar::from_headers(request.headers()))
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?,
    };

    let claims = state.codec.verify_access(&token).map_err(|e| {
        debug!(reason = %e, "access token rejected");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    request.extensions_mut().insert(AuthenticatedProfile(claims));

    Ok(next.run(request).await)
}
