//! External identity providers.
//!
//! A provider turns an OAuth authorization code into a [`ProviderIdentity`].
//! Calls are bounded by a fixed timeout and never retried: a timeout or non-2xx
//! response is [`IdentityError::ProviderUnavailable`], never "no identity".

pub mod github;
pub mod state;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use github::GitHubProvider;
pub use state::OAuthStateStore;

/// Identity-provider and linking errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("provider did not supply a usable email address")]
    EmailUnavailable,

    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("identity provider not configured: {0}")]
    NotConfigured(String),

    #[error("unknown identity provider: {0}")]
    UnknownProvider(String),

    /// The provider refused the authorization code.
    #[error("identity provider rejected the login: {0}")]
    Rejected(String),

    #[error("invalid or expired OAuth state")]
    InvalidState,

    #[error("identity conflict: {0}")]
    Conflict(String),
}

/// An account as reported by an external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    /// Stable provider-side user id.
    pub user_id: String,
    /// Provider handle (login name); seeds generated usernames.
    pub handle: String,
    /// Email from the profile endpoint, if public.
    pub email: Option<String>,
}

/// One address from a provider's "list emails" endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ProviderEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

/// OAuth identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name as used in routes and `external_identities`.
    fn name(&self) -> &str;

    /// URL to send the user to, carrying the CSRF `state`.
    fn authorize_url(&self, state: &str) -> Result<String, IdentityError>;

    /// Exchange an authorization code for a provider access token.
    async fn exchange_code(&self, code: &str) -> Result<String, IdentityError>;

    /// Fetch the authenticated user's identity.
    async fn fetch_identity(&self, access_token: &str) -> Result<ProviderIdentity, IdentityError>;

    /// Secondary lookup used when the identity carries no email.
    async fn list_emails(&self, access_token: &str) -> Result<Vec<ProviderEmail>, IdentityError>;

    /// Code → identity with an email resolved, or `EmailUnavailable`.
    async fn authenticate(&self, code: &str) -> Result<ProviderIdentity, IdentityError> {
        let token = self.exchange_code(code).await?;
        let mut identity = self.fetch_identity(&token).await?;
        if identity.email.as_deref().is_none_or(|e| e.trim().is_empty()) {
            let emails = self.list_emails(&token).await?;
            identity.email = Some(pick_email(&emails).ok_or(IdentityError::EmailUnavailable)?);
        }
        Ok(identity)
    }
}

/// Prefer the primary verified address, then any verified one.
pub fn pick_email(emails: &[ProviderEmail]) -> Option<String> {
    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.iter().find(|e| e.verified))
        .map(|e| e.email.clone())
}

/// Configured providers by name.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn IdentityProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn IdentityProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Look up a provider. Known-but-unconfigured providers are reported as
    /// `NotConfigured`, anything else as `UnknownProvider`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn IdentityProvider>, IdentityError> {
        if let Some(provider) = self.providers.get(name) {
            return Ok(provider.clone());
        }
        if KNOWN_PROVIDERS.contains(&name) {
            Err(IdentityError::NotConfigured(name.to_string()))
        } else {
            Err(IdentityError::UnknownProvider(name.to_string()))
        }
    }
}

/// Providers this build knows how to talk to.
pub const KNOWN_PROVIDERS: &[&str] = &[github::PROVIDER_NAME];
