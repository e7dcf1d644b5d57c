//! Refresh token verification and rotation.
//!
//! A refresh request walks these checks in order, stopping at the first
//! failure:
//!
//! 1. signature and token expiry (stateless, [`ClaimsCodec`]) → `Malformed` / `Expired`
//! 2. profile lookup and `credential_version` → `ProfileNotFound` / `VersionMismatch`
//! 3. record lookup by `jti` → `RecordNotFound` / `AlreadyRevoked` / `RecordExpired`
//! 4. rotation: revoke the presented record and append its replacement
//!
//! Steps 2 to 4 run inside one conditional store update. If a concurrent request
//! rotates the same token first, the update is retried on the fresh profile and
//! step 3 then fails, so each refresh token is usable exactly once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::claims::ClaimsCodec;
use super::issuer::CredentialIssuer;
use super::records::CredentialRecordStore;
use super::revocation::RevocationController;
use super::{AuthError, CredentialError};
use crate::models::auth::{ClientMeta, Profile, PublicProfile, RefreshClaims, TokenPair};

/// Result of a successful rotation.
#[derive(Debug, Clone)]
pub struct Rotated {
    pub profile: PublicProfile,
    pub tokens: TokenPair,
}

/// Validates inbound refresh tokens and rotates them.
#[derive(Clone)]
pub struct CredentialVerifier {
    codec: Arc<ClaimsCodec>,
    records: CredentialRecordStore,
    issuer: CredentialIssuer,
}

impl CredentialVerifier {
    pub fn new(
        codec: Arc<ClaimsCodec>,
        records: CredentialRecordStore,
        issuer: CredentialIssuer,
    ) -> Self {
        Self {
            codec,
            records,
            issuer,
        }
    }

    /// Exchange a refresh token for a new pair, revoking the presented one.
    pub async fn rotate(&self, token: &str, client: ClientMeta) -> Result<Rotated, AuthError> {
        let claims = self.codec.verify_refresh(token).inspect_err(log_rejection)?;
        debug!(profile_id = %claims.sub, jti = %claims.jti, "refresh signature checked");

        let update = self
            .records
            .update(&claims.sub, |profile| {
                let now = Utc::now();
                check_state(profile, &claims, now)?;
                // Stage before revoking: staging prunes revoked records, and the
                // consumed one must stay visible so a replay reads as revoked.
                let replacement = self.issuer.stage(profile, client.clone(), now);
                RevocationController::revoke_in(profile, &claims.jti);
                Ok(replacement)
            })
            .await;

        let (profile, replacement) = match update {
            Ok(done) => done,
            Err(AuthError::ProfileNotFound) => {
                log_rejection(&CredentialError::ProfileNotFound);
                return Err(CredentialError::ProfileNotFound.into());
            }
            Err(AuthError::Credential(e)) => {
                log_rejection(&e);
                return Err(e.into());
            }
            Err(e) => return Err(e),
        };

        let tokens = self.issuer.sign_pair(&profile, &replacement)?;
        info!(
            profile_id = %profile.id,
            consumed = %claims.jti,
            issued = %replacement.id,
            "rotated refresh token"
        );
        Ok(Rotated {
            profile: profile.public_view(),
            tokens,
        })
    }
}

/// Version and record checks against the current profile state.
fn check_state(
    profile: &Profile,
    claims: &RefreshClaims,
    now: DateTime<Utc>,
) -> Result<(), CredentialError> {
    if claims.credential_version != profile.credential_version {
        return Err(CredentialError::VersionMismatch);
    }
    let record = profile
        .record(&claims.jti)
        .ok_or(CredentialError::RecordNotFound)?;
    if record.revoked {
        return Err(CredentialError::AlreadyRevoked);
    }
    if record.is_expired(now) {
        return Err(CredentialError::RecordExpired);
    }
    Ok(())
}

fn log_rejection(e: &CredentialError) {
    warn!(code = e.code(), reason = %e, "refresh token rejected");
}
