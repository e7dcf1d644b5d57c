//! Per-profile refresh-record bookkeeping.
//!
//! Every mutation is a read-modify-write of the whole profile, committed with
//! [`ProfileStore::compare_and_swap`]. When another writer wins the race the
//! closure is re-run against the fresh profile, so a revocation can never be
//! lost and a rotated-out record can never come back.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::AuthError;
use crate::models::auth::{Profile, RefreshRecord};
use crate::store::{ProfileStore, StoreError};

/// Attempts before a contended update gives up.
const MAX_CAS_ATTEMPTS: usize = 16;

/// Refresh records of a profile, persisted through the profile store.
#[derive(Clone)]
pub struct CredentialRecordStore {
    store: Arc<dyn ProfileStore>,
}

impl CredentialRecordStore {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    /// Atomically apply `change` to the profile and persist it.
    ///
    /// `change` may run several times and must derive everything from the
    /// profile it is handed. An `Err` from `change` aborts without writing.
    /// Returns the profile as stored plus whatever `change` produced.
    pub async fn update<T, F>(&self, profile_id: &str, mut change: F) -> Result<(Profile, T), AuthError>
    where
        F: FnMut(&mut Profile) -> Result<T, AuthError>,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut profile = self
                .store
                .get(profile_id)
                .await?
                .ok_or(AuthError::ProfileNotFound)?;
            let expected = profile.revision;

            let out = change(&mut profile)?;

            match self.store.compare_and_swap(&profile, expected).await {
                Ok(true) => {
                    profile.revision = expected + 1;
                    return Ok((profile, out));
                }
                Ok(false) => {
                    debug!(profile_id, attempt, "profile update lost a race, retrying");
                }
                Err(StoreError::NotFound(_)) => return Err(AuthError::ProfileNotFound),
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::Contention(MAX_CAS_ATTEMPTS).into())
    }

    /// Prune stale records, then append `record`.
    pub async fn append(&self, profile_id: &str, record: RefreshRecord) -> Result<Profile, AuthError> {
        let (profile, ()) = self
            .update(profile_id, |p| {
                p.prune_records(Utc::now());
                p.refresh_records.push(record.clone());
                Ok(())
            })
            .await?;
        Ok(profile)
    }

    pub async fn find_by_id(
        &self,
        profile_id: &str,
        record_id: &str,
    ) -> Result<Option<RefreshRecord>, AuthError> {
        let profile = self
            .store
            .get(profile_id)
            .await?
            .ok_or(AuthError::ProfileNotFound)?;
        Ok(profile.record(record_id).cloned())
    }

    /// Mark one record revoked. Returns whether the record exists.
    pub async fn mark_revoked(&self, profile_id: &str, record_id: &str) -> Result<bool, AuthError> {
        let (_, found) = self
            .update(profile_id, |p| Ok(revoke_record(p, record_id)))
            .await?;
        Ok(found)
    }

    /// Mark every record revoked. Returns how many were newly revoked.
    pub async fn revoke_all(&self, profile_id: &str) -> Result<usize, AuthError> {
        let (_, count) = self
            .update(profile_id, |p| Ok(revoke_every_record(p)))
            .await?;
        Ok(count)
    }

    /// Drop expired or revoked records. Returns how many were removed.
    pub async fn prune_expired_and_revoked(&self, profile_id: &str) -> Result<usize, AuthError> {
        let (_, removed) = self
            .update(profile_id, |p| Ok(p.prune_records(Utc::now())))
            .await?;
        Ok(removed)
    }
}

/// Revoke `record_id` in place. Idempotent; returns whether the record exists.
pub(crate) fn revoke_record(profile: &mut Profile, record_id: &str) -> bool {
    match profile.record_mut(record_id) {
        Some(record) => {
            record.revoked = true;
            true
        }
        None => false,
    }
}

/// Revoke every live record in place; returns how many changed.
pub(crate) fn revoke_every_record(profile: &mut Profile) -> usize {
    let mut changed = 0;
    for record in profile.refresh_records.iter_mut().filter(|r| !r.revoked) {
        record.revoked = true;
        changed += 1;
    }
    changed
}
