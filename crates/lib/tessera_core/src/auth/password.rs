//! Password hashing via bcrypt.

use std::sync::LazyLock;

use rand::distr::Alphanumeric;
use rand::{Rng, rng};

use super::AuthError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
///
/// A hash that bcrypt cannot parse never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Stand-in hash checked when no account matches, so an unknown login costs
/// the same bcrypt work as a wrong password.
static UNKNOWN_ACCOUNT_HASH: LazyLock<String> =
    LazyLock::new(|| unusable_password_hash().unwrap_or_default());

/// Run a full bcrypt verification for a login with no matching account.
/// Always returns `false`.
pub fn verify_unknown_account(password: &str) -> bool {
    verify_password(password, &UNKNOWN_ACCOUNT_HASH);
    false
}

/// Hash of a random secret nobody knows, for profiles created through an
/// external provider. Password login against it always fails.
pub fn unusable_password_hash() -> Result<String, AuthError> {
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    hash_password(&secret)
}
