//! PostgreSQL profile store.
//!
//! Refresh records and external identities live as JSONB columns on the
//! profile row. Writes are conditional on `revision`, so a lost race shows up
//! as zero affected rows instead of a silent overwrite.
//!
//! Identities are also mirrored into `profile_identities`, whose primary key
//! makes `(provider, provider_user_id)` unique for every provider. The mirror
//! is rewritten in the same transaction as the row.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use sqlx::types::Json;

use super::{ProfileStore, StoreError};
use crate::models::auth::{Profile, RefreshRecord, Role};

const SELECT_PROFILE: &str = "SELECT id::text, email, username, password_hash, role, \
     credential_version, refresh_records, external_identities, last_login, created_at, revision \
     FROM profiles";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: String,
    email: String,
    username: String,
    password_hash: String,
    role: String,
    credential_version: i64,
    refresh_records: Json<Vec<RefreshRecord>>,
    external_identities: Json<BTreeMap<String, String>>,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    revision: i64,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(StoreError::Corrupt)?;
        Ok(Profile {
            id: row.id,
            email: row.email,
            username: row.username,
            password_hash: row.password_hash,
            role,
            credential_version: row.credential_version,
            refresh_records: row.refresh_records.0,
            external_identities: row.external_identities.0,
            last_login: row.last_login,
            created_at: row.created_at,
            revision: row.revision,
        })
    }
}

/// Map unique-index violations to [`StoreError::Conflict`].
fn map_write_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.constraint().unwrap_or("unique constraint").to_string())
        }
        _ => StoreError::Database(e),
    }
}

/// Replace the identity rows of `profile` with its current map.
async fn sync_identities(
    tx: &mut Transaction<'_, Postgres>,
    profile: &Profile,
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM profile_identities WHERE profile_id = $1::uuid")
        .bind(&profile.id)
        .execute(&mut **tx)
        .await?;
    for (provider, provider_user_id) in &profile.external_identities {
        sqlx::query(
            "INSERT INTO profile_identities (provider, provider_user_id, profile_id) \
             VALUES ($1, $2, $3::uuid)",
        )
        .bind(provider)
        .bind(provider_user_id)
        .bind(&profile.id)
        .execute(&mut **tx)
        .await
        .map_err(map_write_error)?;
    }
    Ok(())
}

/// Profile store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        clause: &str,
        binds: &[&str],
    ) -> Result<Option<Profile>, StoreError> {
        let sql = format!("{SELECT_PROFILE} WHERE {clause}");
        let mut query = sqlx::query_as::<_, ProfileRow>(&sql);
        for value in binds {
            query = query.bind(*value);
        }
        query
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::try_from)
            .transpose()
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get(&self, profile_id: &str) -> Result<Option<Profile>, StoreError> {
        // Non-UUID ids cannot exist; avoid a cast error from Postgres.
        if uuid::Uuid::parse_str(profile_id).is_err() {
            return Ok(None);
        }
        self.fetch_one_where("id = $1::uuid", &[profile_id]).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        self.fetch_one_where("lower(email) = lower($1)", &[email])
            .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, StoreError> {
        self.fetch_one_where("lower(username) = lower($1)", &[username])
            .await
    }

    async fn find_by_external_identity(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<Profile>, StoreError> {
        self.fetch_one_where(
            "id = (SELECT profile_id FROM profile_identities \
                   WHERE provider = $1 AND provider_user_id = $2)",
            &[provider, provider_user_id],
        )
        .await
    }

    async fn insert(&self, profile: &Profile) -> Result<Profile, StoreError> {
        let sql = format!(
            "WITH inserted AS ( \
                INSERT INTO profiles (id, email, username, password_hash, role, \
                    credential_version, refresh_records, external_identities, last_login, \
                    created_at, revision) \
                VALUES ($1::uuid, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0) \
                RETURNING * \
             ) {}",
            SELECT_PROFILE.replace("FROM profiles", "FROM inserted")
        );
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(&profile.id)
            .bind(&profile.email)
            .bind(&profile.username)
            .bind(&profile.password_hash)
            .bind(profile.role.as_str())
            .bind(profile.credential_version)
            .bind(Json(&profile.refresh_records))
            .bind(Json(&profile.external_identities))
            .bind(profile.last_login)
            .bind(profile.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?;
        sync_identities(&mut tx, profile).await?;
        tx.commit().await?;
        Profile::try_from(row)
    }

    async fn compare_and_swap(
        &self,
        profile: &Profile,
        expected_revision: i64,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE profiles SET email = $2, username = $3, password_hash = $4, role = $5, \
                credential_version = $6, refresh_records = $7, external_identities = $8, \
                last_login = $9, revision = revision + 1 \
             WHERE id = $1::uuid AND revision = $10",
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.username)
        .bind(&profile.password_hash)
        .bind(profile.role.as_str())
        .bind(profile.credential_version)
        .bind(Json(&profile.refresh_records))
        .bind(Json(&profile.external_identities))
        .bind(profile.last_login)
        .bind(expected_revision)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 1 {
            sync_identities(&mut tx, profile).await?;
            tx.commit().await?;
            return Ok(true);
        }
        tx.rollback().await?;

        // Distinguish a lost race from a deleted profile.
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM profiles WHERE id = $1::uuid)",
        )
        .bind(&profile.id)
        .fetch_one(&self.pool)
        .await?;
        if exists {
            Ok(false)
        } else {
            Err(StoreError::NotFound(profile.id.clone()))
        }
    }
}
