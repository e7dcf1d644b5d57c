//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tessera_core::auth::{AuthError, CredentialError};
use tessera_core::provider::IdentityError;
use tessera_core::store::StoreError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Code sent when a refresh request carries no token at all.
pub const REFRESH_TOKEN_MISSING: &str = "REFRESH_TOKEN_MISSING";

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Refresh token rejected by the verifier.
    #[error("Refresh rejected: {0}")]
    Credential(CredentialError),

    #[error("Refresh token missing")]
    CredentialMissing,

    /// External identity could not be resolved to a profile.
    #[error("Identity conflict: {0}")]
    IdentityConflict(String),

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message, code) = match &self {
            AppError::Validation(m) => {
                (StatusCode::BAD_REQUEST, "validation_error", m.clone(), None)
            }
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.clone(), None),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.clone(), None),
            AppError::Credential(e) => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                e.to_string(),
                Some(e.code()),
            ),
            AppError::CredentialMissing => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Refresh token required".to_string(),
                Some(REFRESH_TOKEN_MISSING),
            ),
            AppError::IdentityConflict(m) => {
                (StatusCode::BAD_REQUEST, "identity_conflict", m.clone(), None)
            }
            AppError::ProviderUnavailable(m) => {
                error!(reason = %m, "identity provider call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "provider_unavailable",
                    "Identity provider unavailable".to_string(),
                    None,
                )
            }
            AppError::Config(m) => {
                error!(reason = %m, "configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "configuration_error",
                    "Server is not configured for this operation".to_string(),
                    None,
                )
            }
            AppError::Internal(m) => {
                error!(reason = %m, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
            code: code.map(str::to_string),
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::DuplicateEmail | AuthError::DuplicateUsername => {
                AppError::Validation(e.to_string())
            }
            AuthError::ProfileNotFound => AppError::NotFound("Profile not found".into()),
            AuthError::Credential(e) => AppError::Credential(e),
            AuthError::Identity(e) => AppError::from(e),
            AuthError::Store(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::EmailUnavailable | IdentityError::Conflict(_) => {
                AppError::IdentityConflict(e.to_string())
            }
            IdentityError::InvalidState => AppError::Validation(e.to_string()),
            IdentityError::Rejected(_) => AppError::Unauthorized(e.to_string()),
            IdentityError::UnknownProvider(name) => {
                AppError::NotFound(format!("Unknown identity provider: {name}"))
            }
            IdentityError::NotConfigured(_) => AppError::Config(e.to_string()),
            IdentityError::ProviderUnavailable(msg) => AppError::ProviderUnavailable(msg),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.to_string())
    }
}
