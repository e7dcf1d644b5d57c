//! External identity provider login handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthorizeUrlResponse, LoginStartQuery, OAuthCallbackBody, OAuthCallbackQuery, TokenResponse,
};
use crate::services::{auth, oauth};

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

/// `GET /auth/{provider}/login`: authorization URL as JSON, or a 302 to it
/// with `?redirect=true`.
pub async fn login_start_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<LoginStartQuery>,
) -> AppResult<Response> {
    let url = oauth::start_login(&state, &provider)?;
    if query.redirect {
        Ok(found(url))
    } else {
        Ok(Json(AuthorizeUrlResponse { url }).into_response())
    }
}

/// `GET /auth/{provider}/callback`: browser redirect target. Sets the token
/// cookies and sends the browser on to the frontend with the pair in the
/// URL fragment.
pub async fn callback_redirect_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<(CookieJar, Response)> {
    if let Some(error) = query.error {
        warn!(provider, %error, "provider login declined");
        return Err(AppError::Unauthorized(format!("Provider login failed: {error}")));
    }
    let (code, csrf) = match (query.code, query.state) {
        (Some(code), Some(csrf)) if !code.is_empty() => (code, csrf),
        _ => return Err(AppError::Validation("code and state are required".into())),
    };

    let resp =
        oauth::complete_login(&state, &provider, &code, &csrf, auth::client_meta(&headers)).await?;
    let jar = state.cookies.set_tokens(
        jar,
        &resp.access_token,
        &resp.refresh_token,
        state.config.auth.access_ttl.num_seconds(),
        state.config.auth.refresh_ttl.num_seconds(),
    );
    let location = oauth::frontend_redirect(&state.config.frontend_url, &resp);
    Ok((jar, found(location)))
}

/// `POST /auth/{provider}/callback`: for clients that handle the provider
/// redirect themselves and post `{code, state}`.
pub async fn callback_json_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(body): Json<OAuthCallbackBody>,
) -> AppResult<Json<TokenResponse>> {
    let resp = oauth::complete_login(
        &state,
        &provider,
        &body.code,
        &body.state,
        auth::client_meta(&headers),
    )
    .await?;
    Ok(Json(resp))
}
