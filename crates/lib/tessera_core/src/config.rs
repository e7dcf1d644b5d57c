//! Credential and identity-provider configuration.
//!
//! Built once at process start and shared by reference. Nothing in the core
//! reads the environment per call.

use std::time::Duration as StdDuration;

use chrono::Duration;
use thiserror::Error;

/// Access token lifetime: 24 hours.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Default timeout for calls to an external identity provider.
pub const PROVIDER_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Minimum accepted signing-secret length, in bytes.
const MIN_SECRET_LEN: usize = 32;

/// Configuration errors. Always fatal: a missing secret never falls back to a default.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    #[error("{0} must be at least 32 bytes")]
    SecretTooShort(&'static str),

    #[error("access and refresh signing secrets must differ")]
    SharedSecret,

    #[error("invalid configuration value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Signing secrets and token lifetimes.
#[derive(Clone)]
pub struct AuthConfig {
    access_secret: String,
    refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl AuthConfig {
    /// Validate and build. The two secrets must both be present, long enough,
    /// and distinct so an access token can never verify as a refresh token.
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let access_secret = access_secret.into();
        let refresh_secret = refresh_secret.into();

        check_secret("ACCESS_TOKEN_SECRET", &access_secret)?;
        check_secret("REFRESH_TOKEN_SECRET", &refresh_secret)?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SharedSecret);
        }

        Ok(Self {
            access_secret,
            refresh_secret,
            access_ttl: Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            refresh_ttl: Duration::days(REFRESH_TOKEN_TTL_DAYS),
        })
    }

    pub fn access_secret(&self) -> &[u8] {
        self.access_secret.as_bytes()
    }

    pub fn refresh_secret(&self) -> &[u8] {
        self.refresh_secret.as_bytes()
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

fn check_secret(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing(key));
    }
    if value.len() < MIN_SECRET_LEN {
        return Err(ConfigError::SecretTooShort(key));
    }
    Ok(())
}

/// OAuth client settings for one external identity provider.
#[derive(Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub timeout: StdDuration,
}

impl ProviderConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        let redirect_uri = redirect_uri.into();
        if client_id.trim().is_empty() {
            return Err(ConfigError::Missing("client_id"));
        }
        if client_secret.trim().is_empty() {
            return Err(ConfigError::Missing("client_secret"));
        }
        url::Url::parse(&redirect_uri).map_err(|e| ConfigError::Invalid {
            key: "redirect_uri",
            reason: e.to_string(),
        })?;
        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            timeout: PROVIDER_TIMEOUT,
        })
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("timeout", &self.timeout)
            .finish()
    }
}
