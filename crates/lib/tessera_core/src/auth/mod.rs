//! Authentication and session lifecycle.
//!
//! Provides password hashing, signed claims, refresh-record bookkeeping,
//! token issuance/rotation/revocation and external identity linking, shared
//! by the HTTP layer in `tessera_api`.

pub mod claims;
pub mod issuer;
pub mod linker;
pub mod password;
pub mod records;
pub mod revocation;
pub mod verifier;

use thiserror::Error;

use crate::provider::IdentityError;
use crate::store::StoreError;

/// Why a presented token was rejected.
///
/// Each variant is a terminal state of refresh verification and carries a
/// stable machine-readable [`code`](CredentialError::code) so clients can tell
/// "log in again" from "retry".
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("token is malformed or has an invalid signature")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token subject no longer exists")]
    ProfileNotFound,

    #[error("token version does not match")]
    VersionMismatch,

    #[error("token id not found")]
    RecordNotFound,

    #[error("token has been revoked")]
    AlreadyRevoked,

    #[error("token record has expired")]
    RecordExpired,
}

impl CredentialError {
    pub fn code(&self) -> &'static str {
        match self {
            CredentialError::Malformed | CredentialError::ProfileNotFound => {
                "REFRESH_TOKEN_INVALID"
            }
            CredentialError::Expired | CredentialError::RecordExpired => "REFRESH_TOKEN_EXPIRED",
            CredentialError::VersionMismatch => "TOKEN_VERSION_MISMATCH",
            CredentialError::RecordNotFound => "TOKEN_ID_NOT_FOUND",
            CredentialError::AlreadyRevoked => "TOKEN_REVOKED",
        }
    }
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Username already taken")]
    DuplicateUsername,

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
