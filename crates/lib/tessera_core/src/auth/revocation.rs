//! Single-record and profile-wide revocation.

use tracing::info;

use super::AuthError;
use super::records::{CredentialRecordStore, revoke_every_record, revoke_record};
use crate::models::auth::Profile;

/// Revokes refresh records.
///
/// Changes are written straight to the store; the verifier reads the store on
/// every call, so a revocation is visible to the very next refresh.
#[derive(Clone)]
pub struct RevocationController {
    records: CredentialRecordStore,
}

impl RevocationController {
    pub fn new(records: CredentialRecordStore) -> Self {
        Self { records }
    }

    /// Revoke one record. Idempotent; revoking an unknown record is a no-op.
    pub async fn revoke_one(&self, profile_id: &str, record_id: &str) -> Result<(), AuthError> {
        let found = self.records.mark_revoked(profile_id, record_id).await?;
        info!(profile_id, jti = record_id, found, "revoked refresh record");
        Ok(())
    }

    /// Bump `credential_version` and revoke every record, in one write.
    ///
    /// Every refresh token issued before this call fails with a version
    /// mismatch from now on. Returns the new version.
    pub async fn revoke_all(&self, profile_id: &str) -> Result<i64, AuthError> {
        let (profile, revoked) = self
            .records
            .update(profile_id, |p| Ok(Self::revoke_all_in(p)))
            .await?;
        info!(
            profile_id,
            revoked,
            credential_version = profile.credential_version,
            "revoked all refresh records"
        );
        Ok(profile.credential_version)
    }

    /// In-memory single-record revoke, for callers already inside an update.
    pub fn revoke_in(profile: &mut Profile, record_id: &str) -> bool {
        revoke_record(profile, record_id)
    }

    /// In-memory revoke-all, for callers already inside an update.
    pub fn revoke_all_in(profile: &mut Profile) -> usize {
        profile.credential_version += 1;
        revoke_every_record(profile)
    }
}
