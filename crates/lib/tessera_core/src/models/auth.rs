//! Authentication domain models.
//!
//! These are internal domain models, distinct from the HTTP request/response
//! shapes in `tessera_api` (which rename fields to camelCase etc.).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Profile role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Reviewer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Reviewer => "reviewer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "reviewer" => Ok(Role::Reviewer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Client details captured when a refresh record is issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Server-side bookkeeping for one issued refresh token.
///
/// `id` doubles as the token's `jti` claim. `revoked` only ever moves from
/// `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRecord {
    pub id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default, flatten)]
    pub client: ClientMeta,
}

impl RefreshRecord {
    /// Build a fresh, unrevoked record valid for `ttl` from `now`.
    pub fn new(id: String, now: DateTime<Utc>, ttl: Duration, client: ClientMeta) -> Self {
        Self {
            id,
            issued_at: now,
            expires_at: now + ttl,
            revoked: false,
            client,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Whether the record can be dropped by pruning.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.revoked || self.is_expired(now)
    }
}

/// Identity root: a locally-owned profile.
///
/// `revision` is the store's optimistic concurrency token. It is bumped by the
/// store on every successful write and is not part of the domain state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    pub credential_version: i64,
    #[serde(default)]
    pub refresh_records: Vec<RefreshRecord>,
    /// provider name → provider user id
    #[serde(default)]
    pub external_identities: BTreeMap<String, String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: i64,
}

impl Profile {
    /// A new profile with `credential_version = 1` and no records.
    pub fn new(id: String, email: String, username: String, password_hash: String) -> Self {
        Self {
            id,
            email,
            username,
            password_hash,
            role: Role::default(),
            credential_version: 1,
            refresh_records: Vec::new(),
            external_identities: BTreeMap::new(),
            last_login: None,
            created_at: Utc::now(),
            revision: 0,
        }
    }

    pub fn record(&self, record_id: &str) -> Option<&RefreshRecord> {
        self.refresh_records.iter().find(|r| r.id == record_id)
    }

    pub fn record_mut(&mut self, record_id: &str) -> Option<&mut RefreshRecord> {
        self.refresh_records.iter_mut().find(|r| r.id == record_id)
    }

    /// Drop records that are expired or revoked. Returns how many were removed.
    pub fn prune_records(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.refresh_records.len();
        self.refresh_records.retain(|r| !r.is_stale(now));
        before - self.refresh_records.len()
    }

    pub fn external_identity(&self, provider: &str) -> Option<&str> {
        self.external_identities.get(provider).map(String::as_str)
    }

    /// Fields safe to return to the profile's owner.
    pub fn public_view(&self) -> PublicProfile {
        PublicProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            role: self.role,
            providers: self.external_identities.keys().cloned().collect(),
            last_login: self.last_login,
        }
    }
}

/// Public projection of a [`Profile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub providers: Vec<String>,
    pub last_login: Option<DateTime<Utc>>,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: profile ID (standard JWT `sub` claim).
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

impl AccessClaims {
    /// Claims for `profile` issued at `now`, valid for `ttl`.
    pub fn for_profile(profile: &Profile, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: profile.id.clone(),
            email: profile.email.clone(),
            role: profile.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// JWT claims embedded in refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    /// Snapshot of the profile's `credential_version` at issuance.
    #[serde(rename = "tokenVersion")]
    pub credential_version: i64,
    /// Refresh record id.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl RefreshClaims {
    /// Claims bound to `record`; expiry matches the record's.
    pub fn for_record(profile: &Profile, record: &RefreshRecord) -> Self {
        Self {
            sub: profile.id.clone(),
            credential_version: profile.credential_version,
            jti: record.id.clone(),
            iat: record.issued_at.timestamp(),
            exp: record.expires_at.timestamp(),
        }
    }
}

/// A freshly signed access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}
