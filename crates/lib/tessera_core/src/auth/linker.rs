//! External identity → local profile reconciliation.
//!
//! [`IdentityLinker::resolve`] decides between three outcomes, in order:
//!
//! 1. **Matched**: a profile already carries this provider identity. Returned
//!    as-is, no write.
//! 2. **Linked**: a profile owns the candidate email. The identity is written
//!    onto it through a conditional update.
//! 3. **Created**: a fresh profile with a generated username and an unusable
//!    password hash.
//!
//! A unique-index conflict while linking or creating means a concurrent
//! resolve got there first, so the decision is re-run from step 1.

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{debug, info};

use super::AuthError;
use super::password::unusable_password_hash;
use super::records::CredentialRecordStore;
use crate::models::auth::Profile;
use crate::provider::IdentityError;
use crate::store::{ProfileStore, StoreError};
use crate::uuid::uuidv7;

/// Attempts before a contended resolve gives up.
const MAX_RESOLVE_ATTEMPTS: usize = 5;

/// Random suffix length for generated usernames.
const USERNAME_SUFFIX_LEN: usize = 6;

/// Longest handle prefix kept in a generated username.
const MAX_HANDLE_LEN: usize = 24;

/// How `resolve` found its profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Matched(Profile),
    Linked(Profile),
    Created(Profile),
}

impl LinkOutcome {
    pub fn profile(&self) -> &Profile {
        match self {
            LinkOutcome::Matched(p) | LinkOutcome::Linked(p) | LinkOutcome::Created(p) => p,
        }
    }

    pub fn into_profile(self) -> Profile {
        match self {
            LinkOutcome::Matched(p) | LinkOutcome::Linked(p) | LinkOutcome::Created(p) => p,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LinkOutcome::Matched(_) => "matched",
            LinkOutcome::Linked(_) => "linked",
            LinkOutcome::Created(_) => "created",
        }
    }
}

/// Reconciles provider identities with local profiles.
#[derive(Clone)]
pub struct IdentityLinker {
    records: CredentialRecordStore,
}

impl IdentityLinker {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            records: CredentialRecordStore::new(store),
        }
    }

    fn store(&self) -> &Arc<dyn ProfileStore> {
        self.records.profiles()
    }

    /// Find, link or create the profile for `provider`/`provider_user_id`.
    ///
    /// `handle` seeds the username of a newly created profile. Fails with
    /// [`IdentityError::EmailUnavailable`] when no identity matches and there
    /// is no email to link or create with.
    pub async fn resolve(
        &self,
        provider: &str,
        provider_user_id: &str,
        candidate_email: Option<&str>,
        handle: &str,
    ) -> Result<LinkOutcome, AuthError> {
        let email = candidate_email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| e.contains('@'));

        for attempt in 1..=MAX_RESOLVE_ATTEMPTS {
            if let Some(profile) = self
                .store()
                .find_by_external_identity(provider, provider_user_id)
                .await?
            {
                debug!(provider, profile_id = %profile.id, "external identity matched");
                return Ok(LinkOutcome::Matched(profile));
            }

            let email = email.as_deref().ok_or(IdentityError::EmailUnavailable)?;

            let result = match self.store().find_by_email(email).await? {
                Some(existing) => self
                    .link(&existing.id, provider, provider_user_id)
                    .await
                    .map(LinkOutcome::Linked),
                None => self
                    .create(provider, provider_user_id, email, handle)
                    .await
                    .map(LinkOutcome::Created),
            };

            match result {
                Ok(outcome) => {
                    info!(
                        provider,
                        profile_id = %outcome.profile().id,
                        outcome = outcome.kind(),
                        "external identity resolved"
                    );
                    return Ok(outcome);
                }
                Err(AuthError::Store(StoreError::Conflict(what))) => {
                    debug!(provider, attempt, %what, "identity resolve raced, retrying");
                }
                // Deleted between lookup and link.
                Err(AuthError::ProfileNotFound) => {
                    debug!(provider, attempt, "linked profile vanished, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Contention(MAX_RESOLVE_ATTEMPTS).into())
    }

    async fn link(
        &self,
        profile_id: &str,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Profile, AuthError> {
        let (profile, ()) = self
            .records
            .update(profile_id, |p| {
                match p.external_identity(provider) {
                    Some(existing) if existing != provider_user_id => {
                        return Err(IdentityError::Conflict(format!(
                            "email already linked to another {provider} account"
                        ))
                        .into());
                    }
                    _ => {}
                }
                p.external_identities
                    .insert(provider.to_string(), provider_user_id.to_string());
                Ok(())
            })
            .await?;
        Ok(profile)
    }

    async fn create(
        &self,
        provider: &str,
        provider_user_id: &str,
        email: &str,
        handle: &str,
    ) -> Result<Profile, AuthError> {
        let mut profile = Profile::new(
            uuidv7().to_string(),
            email.to_string(),
            generate_username(handle),
            unusable_password_hash()?,
        );
        profile
            .external_identities
            .insert(provider.to_string(), provider_user_id.to_string());
        Ok(self.store().insert(&profile).await?)
    }
}

/// `handle` lowercased and reduced to `[a-z0-9_-]`, plus a random suffix.
pub fn generate_username(handle: &str) -> String {
    let mut base: String = handle
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_HANDLE_LEN)
        .collect();
    if base.is_empty() {
        base.push_str("user");
    }
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(USERNAME_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{base}-{suffix}")
}
