//! Profile persistence.
//!
//! The store is the only shared mutable resource in the core. Every write goes
//! through [`ProfileStore::compare_and_swap`], an optimistic check-and-set on
//! the profile's `revision`, so two concurrent read-modify-write cycles on the
//! same profile can never both land.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::auth::Profile;

pub use memory::MemoryProfileStore;
pub use postgres::PgProfileStore;

/// Profile store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("profile not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint (email, username, external identity) was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Optimistic updates kept losing the race.
    #[error("gave up after {0} conflicting updates")]
    Contention(usize),

    #[error("stored profile is corrupt: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Keyed access to profiles.
///
/// Implementations must give read-after-write consistency: once
/// `compare_and_swap` returns `true`, every subsequent `get` observes the write.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, profile_id: &str) -> Result<Option<Profile>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, StoreError>;

    async fn find_by_external_identity(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<Profile>, StoreError>;

    /// Insert a new profile. Fails with [`StoreError::Conflict`] when the
    /// email, username or any external identity is already taken.
    async fn insert(&self, profile: &Profile) -> Result<Profile, StoreError>;

    /// Replace the stored profile iff its revision still equals
    /// `expected_revision`. Returns `false` when another writer got there first.
    /// On success the stored revision is `expected_revision + 1`.
    async fn compare_and_swap(
        &self,
        profile: &Profile,
        expected_revision: i64,
    ) -> Result<bool, StoreError>;
}
