//! Password registration/login and session flows, delegating to `tessera_core::auth`.

use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use tessera_core::auth::AuthError;
use tessera_core::auth::password::{
    MIN_PASSWORD_LEN, hash_password, verify_password, verify_unknown_account,
};
use tessera_core::models::auth::{ClientMeta, Profile, PublicProfile};
use tessera_core::store::StoreError;
use tessera_core::uuid::uuidv7;
use tracing::{info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{RegisterRequest, TokenResponse};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;

/// Capture user agent and originating address for a new refresh record.
///
/// The address is the first `X-Forwarded-For` hop, else `X-Real-IP`.
pub fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let header = |name: &'static str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let ip_address = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"))
        .map(str::to_string);
    ClientMeta {
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ip_address,
    }
}

/// Check registration input. Returns the normalized email.
pub fn validate_registration(email: &str, username: &str, password: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => return Err(AppError::Validation("A valid email is required".into())),
    }
    let username_ok = (USERNAME_MIN..=USERNAME_MAX).contains(&username.chars().count())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !username_ok {
        return Err(AppError::Validation(format!(
            "Username must be {USERNAME_MIN}-{USERNAME_MAX} characters of letters, digits, '_' or '-'"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(email)
}

/// Create a password profile and sign it in.
pub async fn register(
    state: &AppState,
    req: &RegisterRequest,
    client: ClientMeta,
) -> AppResult<TokenResponse> {
    let email = validate_registration(&req.email, &req.username, &req.password)?;

    if state.store.find_by_email(&email).await?.is_some() {
        return Err(AuthError::DuplicateEmail.into());
    }
    if state.store.find_by_username(&req.username).await?.is_some() {
        return Err(AuthError::DuplicateUsername.into());
    }

    let profile = Profile::new(
        uuidv7().to_string(),
        email.clone(),
        req.username.clone(),
        hash_password(&req.password)?,
    );
    let profile = match state.store.insert(&profile).await {
        Ok(p) => p,
        // Lost a race with a concurrent registration.
        Err(StoreError::Conflict(_)) => {
            return Err(if state.store.find_by_email(&email).await?.is_some() {
                AuthError::DuplicateEmail.into()
            } else {
                AuthError::DuplicateUsername.into()
            });
        }
        Err(e) => return Err(e.into()),
    };
    info!(profile_id = %profile.id, "registered profile");

    issue(state, &profile.id, client).await
}

/// Check email and password, then issue a pair.
///
/// Unknown email and wrong password fail identically.
pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
    client: ClientMeta,
) -> AppResult<TokenResponse> {
    let email = email.trim().to_lowercase();
    let Some(profile) = state.store.find_by_email(&email).await? else {
        verify_unknown_account(password);
        warn!("login for unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };
    if !verify_password(password, &profile.password_hash) {
        warn!(profile_id = %profile.id, "login with wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }
    issue(state, &profile.id, client).await
}

/// Rotate a refresh token.
pub async fn refresh(
    state: &AppState,
    refresh_token: &str,
    client: ClientMeta,
) -> AppResult<TokenResponse> {
    let rotated = state.verifier.rotate(refresh_token, client).await?;
    Ok(TokenResponse::new(rotated.profile, rotated.tokens))
}

/// Revoke every session of `profile_id`.
pub async fn logout(state: &AppState, profile_id: &str) -> AppResult<()> {
    state.revocation.revoke_all(profile_id).await?;
    Ok(())
}

/// Public view of `profile_id`.
pub async fn profile(state: &AppState, profile_id: &str) -> AppResult<PublicProfile> {
    state
        .store
        .get(profile_id)
        .await?
        .map(|p| p.public_view())
        .ok_or_else(|| AppError::NotFound("Profile not found".into()))
}

/// Issue a fresh pair for an authenticated profile.
pub async fn issue(state: &AppState, profile_id: &str, client: ClientMeta) -> AppResult<TokenResponse> {
    let (profile, tokens) = state.issuer.issue(profile_id, client).await?;
    Ok(TokenResponse::new(profile.public_view(), tokens))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn registration_input_is_validated() {
        assert_eq!(
            validate_registration(" A@X.com ", "alice", "password1").unwrap(),
            "a@x.com"
        );
        assert!(validate_registration("no-at-sign", "alice", "password1").is_err());
        assert!(validate_registration("@x.com", "alice", "password1").is_err());
        assert!(validate_registration("a@x.com", "al", "password1").is_err());
        assert!(validate_registration("a@x.com", "al ice", "password1").is_err());
        assert!(validate_registration("a@x.com", &"a".repeat(33), "password1").is_err());
        assert!(validate_registration("a@x.com", "alice", "short").is_err());
    }

    #[test]
    fn client_meta_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("curl/8"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));

        let meta = client_meta(&headers);
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8"));
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.9"));

        headers.remove("x-forwarded-for");
        assert_eq!(client_meta(&headers).ip_address.as_deref(), Some("10.0.0.2"));
        assert_eq!(client_meta(&HeaderMap::new()), ClientMeta::default());
    }
}
