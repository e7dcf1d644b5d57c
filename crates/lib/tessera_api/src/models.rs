//! Request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::models::auth::{PublicProfile, TokenPair};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh body for clients that don't use cookies.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Public profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub email: String,
    pub username: String,
    pub role: String,
    pub providers: Vec<String>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<PublicProfile> for ProfileView {
    fn from(p: PublicProfile) -> Self {
        Self {
            id: p.id,
            email: p.email,
            username: p.username,
            role: p.role.to_string(),
            providers: p.providers,
            last_login: p.last_login,
        }
    }
}

/// Token pair plus the profile it was issued for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: ProfileView,
}

impl TokenResponse {
    pub fn new(profile: PublicProfile, tokens: TokenPair) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "Bearer".into(),
            expires_in: tokens.expires_in,
            user: profile.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeUrlResponse {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginStartQuery {
    #[serde(default)]
    pub redirect: bool,
}

/// Query string the provider redirects back with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user declined.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthCallbackBody {
    pub code: String,
    pub state: String,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Machine-readable reason, set for refresh-token rejections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
