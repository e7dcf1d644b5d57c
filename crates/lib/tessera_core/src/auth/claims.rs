//! JWT signing and verification for access and refresh tokens.
//!
//! Each purpose has its own HS256 secret, so an access token never verifies
//! where a refresh token is expected and vice versa. Expiry is checked here,
//! statelessly; nothing in this module touches the store.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{AuthError, CredentialError};
use crate::config::AuthConfig;
use crate::models::auth::{AccessClaims, RefreshClaims};

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Signs and verifies access/refresh claim sets.
pub struct ClaimsCodec {
    access: KeyPair,
    refresh: KeyPair,
    validation: Validation,
}

impl ClaimsCodec {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            access: KeyPair::from_secret(config.access_secret()),
            refresh: KeyPair::from_secret(config.refresh_secret()),
            validation,
        }
    }

    pub fn sign_access(&self, claims: &AccessClaims) -> Result<String, AuthError> {
        sign(claims, &self.access)
    }

    pub fn sign_refresh(&self, claims: &RefreshClaims) -> Result<String, AuthError> {
        sign(claims, &self.refresh)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, CredentialError> {
        verify(token, &self.access, &self.validation)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, CredentialError> {
        verify(token, &self.refresh, &self.validation)
    }
}

fn sign<T: Serialize>(claims: &T, keys: &KeyPair) -> Result<String, AuthError> {
    encode(&Header::default(), claims, &keys.encoding)
        .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
}

fn verify<T: DeserializeOwned>(
    token: &str,
    keys: &KeyPair,
    validation: &Validation,
) -> Result<T, CredentialError> {
    decode::<T>(token, &keys.decoding, validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => CredentialError::Expired,
            _ => CredentialError::Malformed,
        })
}
