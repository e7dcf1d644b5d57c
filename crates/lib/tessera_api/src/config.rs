//! API server configuration.

use tessera_core::config::{AuthConfig, ConfigError, ProviderConfig};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3100";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

/// Configuration for the API server. Built once at startup.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL. `None` only in in-memory mode.
    pub database_url: Option<String>,
    /// Signing secrets and token lifetimes.
    pub auth: AuthConfig,
    /// GitHub OAuth client, when configured.
    pub github: Option<ProviderConfig>,
    /// Where the OAuth callback redirects the browser.
    pub frontend_url: String,
    /// Production mode: cookies are `Secure` and `SameSite=Strict`.
    pub production: bool,
}

impl ApiConfig {
    /// Minimal configuration around `auth`, with every other value defaulted.
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            database_url: None,
            auth,
            github: None,
            frontend_url: DEFAULT_FRONTEND_URL.into(),
            production: false,
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable               | Default                                   |
    /// |------------------------|-------------------------------------------|
    /// | `BIND_ADDR`            | `127.0.0.1:3100`                          |
    /// | `DATABASE_URL`         | unset                                     |
    /// | `ACCESS_TOKEN_SECRET`  | required                                  |
    /// | `REFRESH_TOKEN_SECRET` | required                                  |
    /// | `GITHUB_CLIENT_ID`     | unset: GitHub login disabled              |
    /// | `GITHUB_CLIENT_SECRET` | required when `GITHUB_CLIENT_ID` is set   |
    /// | `GITHUB_REDIRECT_URI`  | `http://{BIND_ADDR}/auth/github/callback` |
    /// | `FRONTEND_URL`         | `http://localhost:3000`                   |
    /// | `APP_ENV`              | `development`                             |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());

        let auth = AuthConfig::new(
            var("ACCESS_TOKEN_SECRET").ok_or(ConfigError::Missing("ACCESS_TOKEN_SECRET"))?,
            var("REFRESH_TOKEN_SECRET").ok_or(ConfigError::Missing("REFRESH_TOKEN_SECRET"))?,
        )?;

        let github = match var("GITHUB_CLIENT_ID") {
            Some(client_id) => Some(ProviderConfig::new(
                client_id,
                var("GITHUB_CLIENT_SECRET").ok_or(ConfigError::Missing("GITHUB_CLIENT_SECRET"))?,
                var("GITHUB_REDIRECT_URI")
                    .unwrap_or_else(|| format!("http://{bind_addr}/auth/github/callback")),
            )?),
            None => None,
        };

        let frontend_url = var("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.into());
        url::Url::parse(&frontend_url).map_err(|e| ConfigError::Invalid {
            key: "FRONTEND_URL",
            reason: e.to_string(),
        })?;

        let production = var("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"));

        Ok(Self {
            bind_addr,
            database_url: var("DATABASE_URL"),
            auth,
            github,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            production,
        })
    }
}
