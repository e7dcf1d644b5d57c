//! GitHub OAuth identity provider.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use tracing::debug;

use super::{IdentityError, IdentityProvider, ProviderEmail, ProviderIdentity};
use crate::config::ProviderConfig;

/// Name used in routes and `external_identities`.
pub const PROVIDER_NAME: &str = "github";

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const API_BASE: &str = "https://api.github.com";

/// Scopes needed to read the profile and the private email list.
const SCOPES: &str = "read:user user:email";

/// Response from GitHub's token endpoint. Errors arrive with a 200 status
/// and an `error` field instead of a token.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    email: Option<String>,
}

/// GitHub client over `reqwest`, with a fixed per-request timeout.
pub struct GitHubProvider {
    config: ProviderConfig,
    http: reqwest::Client,
    authorize_url: String,
    token_url: String,
    api_base: String,
}

impl GitHubProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IdentityError::NotConfigured(format!("http client: {e}")))?;
        Ok(Self {
            config,
            http,
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            api_base: API_BASE.to_string(),
        })
    }

    /// Send every request to `base` instead of github.com.
    #[cfg(test)]
    fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.authorize_url = format!("{base}/login/oauth/authorize");
        self.token_url = format!("{base}/login/oauth/access_token");
        self.api_base = base.to_string();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<T, IdentityError> {
        let url = format!("{}{path}", self.api_base);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("tessera/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| IdentityError::ProviderUnavailable(format!("GET {path}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(IdentityError::ProviderUnavailable(format!(
                "GET {path}: HTTP {status}"
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| IdentityError::ProviderUnavailable(format!("GET {path} parse error: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for GitHubProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn authorize_url(&self, state: &str) -> Result<String, IdentityError> {
        let url = url::Url::parse_with_params(
            &self.authorize_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", SCOPES),
                ("state", state),
            ],
        )
        .map_err(|e| IdentityError::NotConfigured(format!("authorize url: {e}")))?;
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<String, IdentityError> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let resp = self
            .http
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| IdentityError::ProviderUnavailable(format!("Token exchange failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(IdentityError::ProviderUnavailable(format!(
                "Token exchange HTTP {status}"
            )));
        }

        let body = resp.json::<TokenResponse>().await.map_err(|e| {
            IdentityError::ProviderUnavailable(format!("Token response parse error: {e}"))
        })?;

        match (body.access_token, body.error) {
            (Some(token), None) if !token.is_empty() => {
                debug!("exchanged GitHub authorization code");
                Ok(token)
            }
            (_, Some(error)) => Err(IdentityError::Rejected(
                body.error_description.unwrap_or(error),
            )),
            _ => Err(IdentityError::ProviderUnavailable(
                "Token response carried no access token".into(),
            )),
        }
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<ProviderIdentity, IdentityError> {
        let user: GitHubUser = self.get_json("/user", access_token).await?;
        Ok(ProviderIdentity {
            user_id: user.id.to_string(),
            handle: user.login,
            email: user.email.filter(|e| !e.trim().is_empty()),
        })
    }

    async fn list_emails(&self, access_token: &str) -> Result<Vec<ProviderEmail>, IdentityError> {
        self.get_json("/user/emails", access_token).await
    }
}
