//! Integration test: provider login start, callback (redirect and JSON), and
//! identity linking through a scripted in-test provider.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;
use tessera_core::models::auth::Profile;
use tessera_core::provider::{
    IdentityError, IdentityProvider, ProviderEmail, ProviderIdentity, ProviderRegistry,
};
use tessera_core::store::ProfileStore;

use common::*;

/// Provider that maps authorization codes to canned identities.
struct ScriptedProvider {
    /// code → (identity, secondary email list)
    accounts: HashMap<String, (ProviderIdentity, Vec<ProviderEmail>)>,
}

impl ScriptedProvider {
    fn new() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    fn account(mut self, code: &str, user_id: &str, handle: &str, email: Option<&str>) -> Self {
        self.accounts.insert(
            code.into(),
            (
                ProviderIdentity {
                    user_id: user_id.into(),
                    handle: handle.into(),
                    email: email.map(str::to_string),
                },
                Vec::new(),
            ),
        );
        self
    }

    fn private_email(mut self, code: &str, email: &str) -> Self {
        if let Some((_, emails)) = self.accounts.get_mut(code) {
            emails.push(ProviderEmail {
                email: email.into(),
                primary: true,
                verified: true,
            });
        }
        self
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "github"
    }

    fn authorize_url(&self, state: &str) -> Result<String, IdentityError> {
        Ok(format!("https://idp.test/authorize?state={state}"))
    }

    async fn exchange_code(&self, code: &str) -> Result<String, IdentityError> {
        match code {
            "down" => Err(IdentityError::ProviderUnavailable("HTTP 503".into())),
            c if self.accounts.contains_key(c) => Ok(c.to_string()),
            _ => Err(IdentityError::Rejected("bad_verification_code".into())),
        }
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<ProviderIdentity, IdentityError> {
        Ok(self.accounts[access_token].0.clone())
    }

    async fn list_emails(&self, access_token: &str) -> Result<Vec<ProviderEmail>, IdentityError> {
        Ok(self.accounts[access_token].1.clone())
    }
}

fn registry(provider: ScriptedProvider) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(provider));
    registry
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Start a login and return the issued `state`.
async fn start(app: &axum::Router) -> String {
    let resp = send(app, get("/auth/github/login")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let url = json_body(resp).await["url"].as_str().unwrap().to_string();
    url.split("state=").nth(1).unwrap().to_string()
}

async fn profile_by_identity(
    store: &dyn ProfileStore,
    provider: &str,
    uid: &str,
) -> Option<Profile> {
    store.find_by_external_identity(provider, uid).await.unwrap()
}

#[tokio::test]
async fn login_start_returns_url_or_redirect() {
    let (_, state) = state_with(registry(ScriptedProvider::new()));
    let app = app(&state);

    let resp = send(&app, get("/auth/github/login")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        json_body(resp).await["url"]
            .as_str()
            .unwrap()
            .starts_with("https://idp.test/authorize?state=")
    );

    let resp = send(&app, get("/auth/github/login?redirect=true")).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(
        resp.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .starts_with("https://idp.test/authorize?state=")
    );
    assert_eq!(state.oauth_state.len(), 2);
}

#[tokio::test]
async fn unconfigured_provider_is_a_server_error() {
    let (_, state) = state_with(ProviderRegistry::new());
    let app = app(&state);

    let resp = send(&app, get("/auth/github/login")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let resp = send(&app, get("/auth/myspace/login")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn callback_redirects_to_frontend_with_tokens() {
    let (store, state) = state_with(registry(
        ScriptedProvider::new().account("code-1", "42", "Octo", Some("octo@example.com")),
    ));
    let app = app(&state);
    let csrf = start(&app).await;

    let resp = send(
        &app,
        get(&format!("/auth/github/callback?code=code-1&state={csrf}")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = resp.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.starts_with("http://localhost:3000/auth/callback#accessToken="));
    assert!(location.contains("&refreshToken="));
    assert_eq!(set_cookies(&resp).len(), 2);

    let profile = profile_by_identity(store.as_ref(), "github", "42")
        .await
        .unwrap();
    assert_eq!(profile.email, "octo@example.com");
    assert!(profile.username.starts_with("octo-"));
    assert_eq!(profile.refresh_records.len(), 1);
}

#[tokio::test]
async fn state_is_single_use_and_required() {
    let (_, state) = state_with(registry(
        ScriptedProvider::new().account("code-1", "42", "octo", Some("octo@example.com")),
    ));
    let app = app(&state);
    let csrf = start(&app).await;

    let body = json!({"code": "code-1", "state": csrf});
    let first = send(&app, post_json("/auth/github/callback", body.clone())).await;
    assert_eq!(first.status(), StatusCode::OK);

    let replay = send(&app, post_json("/auth/github/callback", body)).await;
    assert_eq!(replay.status(), StatusCode::BAD_REQUEST);

    let forged = send(
        &app,
        post_json(
            "/auth/github/callback",
            json!({"code": "code-1", "state": "made-up"}),
        ),
    )
    .await;
    assert_eq!(forged.status(), StatusCode::BAD_REQUEST);

    let missing = send(&app, get("/auth/github/callback?code=code-1")).await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn provider_login_links_onto_password_account_by_email() {
    let (store, state) = state_with(registry(
        ScriptedProvider::new().account("code-1", "99", "alice-gh", Some("Alice@example.com")),
    ));
    let app = app(&state);
    let registered = register_alice(&app).await;
    let csrf = start(&app).await;

    let resp = send(
        &app,
        post_json(
            "/auth/github/callback",
            json!({"code": "code-1", "state": csrf}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["user"]["id"], registered["user"]["id"]);
    assert_eq!(json["user"]["providers"], json!(["github"]));

    let linked = profile_by_identity(store.as_ref(), "github", "99")
        .await
        .unwrap();
    assert_eq!(linked.username, "alice");
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn private_email_falls_back_to_the_email_list() {
    let (store, state) = state_with(registry(
        ScriptedProvider::new()
            .account("code-1", "7", "quiet", None)
            .private_email("code-1", "quiet@example.com"),
    ));
    let app = app(&state);
    let csrf = start(&app).await;

    let resp = send(
        &app,
        post_json("/auth/github/callback", json!({"code": "code-1", "state": csrf})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile = profile_by_identity(store.as_ref(), "github", "7")
        .await
        .unwrap();
    assert_eq!(profile.email, "quiet@example.com");
}

#[tokio::test]
async fn provider_failures_map_to_statuses() {
    let (store, state) = state_with(registry(
        ScriptedProvider::new().account("no-email", "8", "ghost", None),
    ));
    let app = app(&state);

    for (code, status) in [
        ("no-email", StatusCode::BAD_REQUEST),
        ("bogus", StatusCode::UNAUTHORIZED),
        ("down", StatusCode::INTERNAL_SERVER_ERROR),
    ] {
        let csrf = start(&app).await;
        let resp = send(
            &app,
            post_json("/auth/github/callback", json!({"code": code, "state": csrf})),
        )
        .await;
        assert_eq!(resp.status(), status, "code {code}");
    }
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn repeat_provider_login_reuses_the_profile() {
    let (store, state) = state_with(registry(
        ScriptedProvider::new().account("code-1", "42", "octo", Some("octo@example.com")),
    ));
    let app = app(&state);

    let mut ids = Vec::new();
    for _ in 0..2 {
        let csrf = start(&app).await;
        let resp = send(
            &app,
            post_json("/auth/github/callback", json!({"code": "code-1", "state": csrf})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        ids.push(json_body(resp).await["user"]["id"].clone());
    }
    assert_eq!(ids[0], ids[1]);
    assert_eq!(store.len().await, 1);
}
