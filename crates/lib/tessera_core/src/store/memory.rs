//! In-process profile store.
//!
//! Used by tests and the `--in-memory` development mode. A single lock guards
//! the profiles and their unique indexes so uniqueness checks and writes
//! happen together.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ProfileStore, StoreError};
use crate::models::auth::Profile;

#[derive(Default)]
struct Inner {
    profiles: HashMap<String, Profile>,
    by_email: HashMap<String, String>,
    by_username: HashMap<String, String>,
    /// (provider, provider user id) → profile id
    by_identity: HashMap<(String, String), String>,
}

impl Inner {
    /// Check `profile` against every unique index, ignoring its own entries.
    fn check_unique(&self, profile: &Profile) -> Result<(), StoreError> {
        let taken_by_other = |owner: Option<&String>| owner.is_some_and(|id| *id != profile.id);

        if taken_by_other(self.by_email.get(&profile.email.to_lowercase())) {
            return Err(StoreError::Conflict(format!("email {}", profile.email)));
        }
        if taken_by_other(self.by_username.get(&profile.username.to_lowercase())) {
            return Err(StoreError::Conflict(format!("username {}", profile.username)));
        }
        for (provider, uid) in &profile.external_identities {
            if taken_by_other(self.by_identity.get(&(provider.clone(), uid.clone()))) {
                return Err(StoreError::Conflict(format!("{provider} identity {uid}")));
            }
        }
        Ok(())
    }

    fn unindex(&mut self, profile: &Profile) {
        self.by_email.remove(&profile.email.to_lowercase());
        self.by_username.remove(&profile.username.to_lowercase());
        for (provider, uid) in &profile.external_identities {
            self.by_identity.remove(&(provider.clone(), uid.clone()));
        }
    }

    fn index(&mut self, profile: &Profile) {
        self.by_email
            .insert(profile.email.to_lowercase(), profile.id.clone());
        self.by_username
            .insert(profile.username.to_lowercase(), profile.id.clone());
        for (provider, uid) in &profile.external_identities {
            self.by_identity
                .insert((provider.clone(), uid.clone()), profile.id.clone());
        }
    }

    fn lookup(&self, id: Option<&String>) -> Option<Profile> {
        id.and_then(|id| self.profiles.get(id)).cloned()
    }
}

/// Profile store backed by process memory.
#[derive(Default)]
pub struct MemoryProfileStore {
    inner: RwLock<Inner>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles.
    pub async fn len(&self) -> usize {
        self.inner.read().await.profiles.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, profile_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.inner.read().await.profiles.get(profile_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.lookup(inner.by_email.get(&email.to_lowercase())))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.lookup(inner.by_username.get(&username.to_lowercase())))
    }

    async fn find_by_external_identity(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<Profile>, StoreError> {
        let inner = self.inner.read().await;
        let key = (provider.to_string(), provider_user_id.to_string());
        Ok(inner.lookup(inner.by_identity.get(&key)))
    }

    async fn insert(&self, profile: &Profile) -> Result<Profile, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.profiles.contains_key(&profile.id) {
            return Err(StoreError::Conflict(format!("profile id {}", profile.id)));
        }
        inner.check_unique(profile)?;

        let mut stored = profile.clone();
        stored.revision = 0;
        inner.index(&stored);
        inner.profiles.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn compare_and_swap(
        &self,
        profile: &Profile,
        expected_revision: i64,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let current = inner
            .profiles
            .get(&profile.id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(profile.id.clone()))?;
        if current.revision != expected_revision {
            return Ok(false);
        }
        inner.check_unique(profile)?;

        let mut stored = profile.clone();
        stored.revision = expected_revision + 1;
        inner.unindex(&current);
        inner.index(&stored);
        inner.profiles.insert(stored.id.clone(), stored);
        Ok(true)
    }
}
