//! Shared helpers for the API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use tessera_api::config::ApiConfig;
use tessera_api::{AppState, router};
use tessera_core::config::AuthConfig;
use tessera_core::provider::ProviderRegistry;
use tessera_core::store::MemoryProfileStore;
use tower::ServiceExt;

pub const ACCESS_SECRET: &str = "it-access-secret-0123456789abcdef-xyz";
pub const REFRESH_SECRET: &str = "it-refresh-secret-0123456789abcdef-xyz";

pub fn config() -> ApiConfig {
    ApiConfig::new(AuthConfig::new(ACCESS_SECRET, REFRESH_SECRET).unwrap())
}

/// App state over a fresh in-memory store.
pub fn state_with(providers: ProviderRegistry) -> (Arc<MemoryProfileStore>, AppState) {
    let store = Arc::new(MemoryProfileStore::new());
    let state = AppState::new(config(), store.clone(), providers);
    (store, state)
}

pub fn app(state: &AppState) -> Router {
    router(state.clone())
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("request")
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(resp: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}

/// All `Set-Cookie` header values.
pub fn set_cookies(resp: &Response<Body>) -> Vec<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Register `alice` and return the token response body.
pub async fn register_alice(app: &Router) -> serde_json::Value {
    let resp = send(
        app,
        post_json(
            "/auth/register",
            serde_json::json!({
                "email": "alice@example.com",
                "username": "alice",
                "password": "correct horse"
            }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await
}
