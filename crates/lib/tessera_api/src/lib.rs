//! # tessera_api
//!
//! HTTP API library for Tessera.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tessera_core::auth::claims::ClaimsCodec;
use tessera_core::auth::issuer::CredentialIssuer;
use tessera_core::auth::linker::IdentityLinker;
use tessera_core::auth::records::CredentialRecordStore;
use tessera_core::auth::revocation::RevocationController;
use tessera_core::auth::verifier::CredentialVerifier;
use tessera_core::provider::{GitHubProvider, IdentityError, OAuthStateStore, ProviderRegistry};
use tessera_core::store::ProfileStore;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{auth, oauth};
use crate::services::cookies::CookiePolicy;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub store: Arc<dyn ProfileStore>,
    pub codec: Arc<ClaimsCodec>,
    pub issuer: CredentialIssuer,
    pub verifier: CredentialVerifier,
    pub revocation: RevocationController,
    pub linker: IdentityLinker,
    pub providers: ProviderRegistry,
    pub oauth_state: Arc<OAuthStateStore>,
    pub cookies: CookiePolicy,
}

impl AppState {
    /// Wire the credential services over `store`.
    pub fn new(config: ApiConfig, store: Arc<dyn ProfileStore>, providers: ProviderRegistry) -> Self {
        let codec = Arc::new(ClaimsCodec::new(&config.auth));
        let records = CredentialRecordStore::new(store.clone());
        let issuer = CredentialIssuer::new(codec.clone(), records.clone(), &config.auth);
        let verifier = CredentialVerifier::new(codec.clone(), records.clone(), issuer.clone());
        Self {
            cookies: CookiePolicy::for_env(config.production),
            config: Arc::new(config),
            linker: IdentityLinker::new(store.clone()),
            revocation: RevocationController::new(records),
            store,
            codec,
            issuer,
            verifier,
            providers,
            oauth_state: Arc::new(OAuthStateStore::new()),
        }
    }
}

/// Providers enabled by `config`.
pub fn providers_from_config(config: &ApiConfig) -> Result<ProviderRegistry, IdentityError> {
    let mut registry = ProviderRegistry::new();
    if let Some(github) = &config.github {
        registry.register(Arc::new(GitHubProvider::new(github.clone())?));
    }
    Ok(registry)
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh-token", post(auth::refresh_handler))
        .route("/auth/{provider}/login", get(oauth::login_start_handler))
        .route(
            "/auth/{provider}/callback",
            get(oauth::callback_redirect_handler).post(oauth::callback_json_handler),
        );

    // Protected routes (require an access token)
    let protected = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/profile", get(auth::profile_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}
