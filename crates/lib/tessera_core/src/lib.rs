//! # tessera_core
//!
//! Core session and credential lifecycle logic for Tessera.
//!
//! The building blocks, leaves first:
//!
//! - [`auth::claims::ClaimsCodec`] signs and verifies access/refresh claims.
//! - [`auth::records::CredentialRecordStore`] owns the per-profile refresh records.
//! - [`auth::issuer::CredentialIssuer`] mints token pairs.
//! - [`auth::verifier::CredentialVerifier`] validates and rotates refresh tokens.
//! - [`auth::revocation::RevocationController`] revokes one or all records.
//! - [`auth::linker::IdentityLinker`] reconciles external identities with profiles.

pub mod auth;
pub mod config;
pub mod db;
pub mod migrate;
pub mod models;
pub mod provider;
pub mod store;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
