//! External-provider login: authorization URL, callback, and the token handoff.

use tessera_core::models::auth::ClientMeta;
use tessera_core::provider::IdentityError;
use tracing::info;

use crate::AppState;
use crate::error::AppResult;
use crate::models::TokenResponse;

/// Authorization URL for `provider`, with a freshly issued `state`.
pub fn start_login(state: &AppState, provider: &str) -> AppResult<String> {
    let idp = state.providers.get(provider)?;
    let csrf = state.oauth_state.issue(provider);
    Ok(idp.authorize_url(&csrf)?)
}

/// Finish a provider login: check `state`, exchange `code`, resolve the
/// profile and issue a pair.
pub async fn complete_login(
    state: &AppState,
    provider: &str,
    code: &str,
    csrf: &str,
    client: ClientMeta,
) -> AppResult<TokenResponse> {
    let idp = state.providers.get(provider)?;
    if !state.oauth_state.take(csrf, provider) {
        return Err(IdentityError::InvalidState.into());
    }

    let identity = idp.authenticate(code).await?;
    let outcome = state
        .linker
        .resolve(
            provider,
            &identity.user_id,
            identity.email.as_deref(),
            &identity.handle,
        )
        .await?;
    info!(
        provider,
        profile_id = %outcome.profile().id,
        outcome = outcome.kind(),
        "provider login"
    );

    let (profile, tokens) = state.issuer.issue(&outcome.profile().id, client).await?;
    Ok(TokenResponse::new(profile.public_view(), tokens))
}

/// Frontend URL carrying the pair in the fragment, so it never reaches a server log.
pub fn frontend_redirect(frontend_url: &str, tokens: &TokenResponse) -> String {
    let fragment = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("accessToken", &tokens.access_token)
        .append_pair("refreshToken", &tokens.refresh_token)
        .append_pair("expiresIn", &tokens.expires_in.to_string())
        .finish();
    format!("{frontend_url}/auth/callback#{fragment}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileView;

    #[test]
    fn redirect_puts_tokens_in_the_fragment() {
        let tokens = TokenResponse {
            access_token: "a.b.c".into(),
            refresh_token: "d.e.f".into(),
            token_type: "Bearer".into(),
            expires_in: 86400,
            user: ProfileView {
                id: "p1".into(),
                email: "a@x.com".into(),
                username: "alice".into(),
                role: "user".into(),
                providers: vec![],
                last_login: None,
            },
        };
        let url = frontend_redirect("http://localhost:3000", &tokens);
        assert_eq!(
            url,
            "http://localhost:3000/auth/callback#accessToken=a.b.c&refreshToken=d.e.f&expiresIn=86400"
        );
    }
}
