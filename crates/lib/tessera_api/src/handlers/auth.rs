//! Password and session request handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedProfile;
use crate::models::{LoginRequest, LogoutResponse, ProfileView, RefreshRequest, RegisterRequest, TokenResponse};
use crate::services::{auth, cookies};

/// Set both token cookies for `resp`.
fn with_token_cookies(state: &AppState, jar: CookieJar, resp: &TokenResponse) -> CookieJar {
    state.cookies.set_tokens(
        jar,
        &resp.access_token,
        &resp.refresh_token,
        state.config.auth.access_ttl.num_seconds(),
        state.config.auth.refresh_ttl.num_seconds(),
    )
}

/// `POST /auth/register`: create a password account and sign it in.
pub async fn register_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<TokenResponse>)> {
    let resp = auth::register(&state, &body, auth::client_meta(&headers)).await?;
    let jar = with_token_cookies(&state, jar, &resp);
    Ok((StatusCode::CREATED, jar, Json(resp)))
}

/// `POST /auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let resp = auth::login(&state, &body.email, &body.password, auth::client_meta(&headers)).await?;
    let jar = with_token_cookies(&state, jar, &resp);
    Ok((jar, Json(resp)))
}

/// `POST /auth/refresh-token`: rotate the refresh token from the cookie or
/// the JSON body. The body is optional for cookie clients.
pub async fn refresh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshRequest::default()
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?
    };
    let token = cookies::refresh_token(&jar)
        .or(from_body.refresh_token.filter(|t| !t.is_empty()))
        .ok_or(AppError::CredentialMissing)?;

    let resp = auth::refresh(&state, &token, auth::client_meta(&headers)).await?;
    let jar = with_token_cookies(&state, jar, &resp);
    Ok((jar, Json(resp)))
}

/// `POST /auth/logout`: revoke every session of the caller. Requires authentication.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedProfile(claims)): Extension<AuthenticatedProfile>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    auth::logout(&state, &claims.sub).await?;
    Ok((state.cookies.clear_tokens(jar), Json(LogoutResponse { success: true })))
}

/// `GET /auth/profile`: the caller's public profile.
pub async fn profile_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedProfile(claims)): Extension<AuthenticatedProfile>,
) -> AppResult<Json<ProfileView>> {
    let profile = auth::profile(&state, &claims.sub).await?;
    Ok(Json(profile.into()))
}
