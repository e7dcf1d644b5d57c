//! Token pair issuance.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::AuthError;
use super::claims::ClaimsCodec;
use super::records::CredentialRecordStore;
use crate::config::AuthConfig;
use crate::models::auth::{AccessClaims, ClientMeta, Profile, RefreshClaims, RefreshRecord, TokenPair};
use crate::uuid::uuidv4;

/// Mints access/refresh pairs and records the refresh half.
#[derive(Clone)]
pub struct CredentialIssuer {
    codec: Arc<ClaimsCodec>,
    records: CredentialRecordStore,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl CredentialIssuer {
    pub fn new(codec: Arc<ClaimsCodec>, records: CredentialRecordStore, config: &AuthConfig) -> Self {
        Self {
            codec,
            records,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    /// Issue a new pair for `profile_id`: one persisted write that prunes stale
    /// records, appends the new one and stamps `last_login`.
    pub async fn issue(
        &self,
        profile_id: &str,
        client: ClientMeta,
    ) -> Result<(Profile, TokenPair), AuthError> {
        let (profile, record) = self
            .records
            .update(profile_id, |p| Ok(self.stage(p, client.clone(), Utc::now())))
            .await?;
        let pair = self.sign_pair(&profile, &record)?;
        info!(profile_id, jti = %record.id, "issued token pair");
        Ok((profile, pair))
    }

    /// Apply a new record to `profile` in memory without persisting.
    ///
    /// Prunes stale records, appends a fresh one and updates `last_login`.
    /// Callers commit it through [`CredentialRecordStore::update`].
    pub fn stage(&self, profile: &mut Profile, client: ClientMeta, now: DateTime<Utc>) -> RefreshRecord {
        let record = RefreshRecord::new(uuidv4().to_string(), now, self.refresh_ttl, client);
        profile.prune_records(now);
        profile.refresh_records.push(record.clone());
        profile.last_login = Some(now);
        record
    }

    /// Sign the access token and the refresh token bound to `record`.
    pub fn sign_pair(&self, profile: &Profile, record: &RefreshRecord) -> Result<TokenPair, AuthError> {
        let access = AccessClaims::for_profile(profile, record.issued_at, self.access_ttl);
        let refresh = RefreshClaims::for_record(profile, record);
        Ok(TokenPair {
            access_token: self.codec.sign_access(&access)?,
            refresh_token: self.codec.sign_refresh(&refresh)?,
            expires_in: self.access_ttl.num_seconds(),
        })
    }
}
