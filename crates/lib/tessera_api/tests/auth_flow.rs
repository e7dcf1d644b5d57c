//! Integration test: register, login, refresh rotation, logout and profile
//! against the in-memory store.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;
use tessera_core::provider::ProviderRegistry;
use tessera_core::store::ProfileStore;

use common::*;

#[tokio::test]
async fn register_returns_pair_and_scoped_cookies() {
    let (_, state) = state_with(ProviderRegistry::new());
    let app = app(&state);

    let resp = send(
        &app,
        post_json(
            "/auth/register",
            json!({"email": "Bob@Example.com", "username": "bob", "password": "hunter2hunter2"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let cookies = set_cookies(&resp);
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("tessera_access=") && c.contains("Path=/;"))
    );
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("tessera_refresh=") && c.contains("Path=/auth/refresh-token"))
    );
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

    let json = json_body(resp).await;
    assert_eq!(json["tokenType"], "Bearer");
    assert_eq!(json["expiresIn"], 86400);
    assert_eq!(json["user"]["email"], "bob@example.com");
    assert_eq!(json["user"]["role"], "user");
    assert!(json["user"].get("passwordHash").is_none());

    let claims = state
        .codec
        .verify_access(json["accessToken"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, json["user"]["id"]);
    assert_eq!(claims.exp - claims.iat, 86400);
}

#[tokio::test]
async fn duplicate_registration_is_rejected_with_distinct_messages() {
    let (_, state) = state_with(ProviderRegistry::new());
    let app = app(&state);
    register_alice(&app).await;

    let dup_email = send(
        &app,
        post_json(
            "/auth/register",
            json!({"email": "ALICE@example.com", "username": "alice2", "password": "password123"}),
        ),
    )
    .await;
    assert_eq!(dup_email.status(), StatusCode::BAD_REQUEST);
    let email_msg = json_body(dup_email).await["message"].clone();

    let dup_name = send(
        &app,
        post_json(
            "/auth/register",
            json!({"email": "other@example.com", "username": "Alice", "password": "password123"}),
        ),
    )
    .await;
    assert_eq!(dup_name.status(), StatusCode::BAD_REQUEST);
    let name_msg = json_body(dup_name).await["message"].clone();

    assert_ne!(email_msg, name_msg);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let (_, state) = state_with(ProviderRegistry::new());
    let app = app(&state);
    register_alice(&app).await;

    let ok = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "alice@example.com", "password": "correct horse"}),
        ),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);

    let wrong_pw = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "alice@example.com", "password": "battery staple"}),
        ),
    )
    .await;
    let unknown = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "nobody@example.com", "password": "correct horse"}),
        ),
    )
    .await;
    assert_eq!(wrong_pw.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(wrong_pw).await, json_body(unknown).await);
}

#[tokio::test]
async fn refresh_rotates_and_rejects_replay() {
    let (_, state) = state_with(ProviderRegistry::new());
    let app = app(&state);
    let first = register_alice(&app).await;
    let refresh = first["refreshToken"].as_str().unwrap().to_string();

    let resp = send(
        &app,
        post_json("/auth/refresh-token", json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rotated = json_body(resp).await;
    assert_ne!(rotated["refreshToken"], first["refreshToken"]);

    let replay = send(
        &app,
        post_json("/auth/refresh-token", json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(replay).await["code"], "TOKEN_REVOKED");
}

#[tokio::test]
async fn refresh_reads_the_cookie() {
    let (_, state) = state_with(ProviderRegistry::new());
    let app = app(&state);
    let first = register_alice(&app).await;

    let req = Request::builder()
        .method("POST")
        .uri("/auth/refresh-token")
        .header(
            header::COOKIE,
            format!("tessera_refresh={}", first["refreshToken"].as_str().unwrap()),
        )
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_token_or_with_garbage_reports_a_code() {
    let (_, state) = state_with(ProviderRegistry::new());
    let app = app(&state);

    let req = Request::builder()
        .method("POST")
        .uri("/auth/refresh-token")
        .body(Body::empty())
        .unwrap();
    let missing = send(&app, req).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(missing).await["code"], "REFRESH_TOKEN_MISSING");

    let garbage = send(
        &app,
        post_json("/auth/refresh-token", json!({"refreshToken": "not.a.jwt"})),
    )
    .await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(garbage).await["code"], "REFRESH_TOKEN_INVALID");
}

#[tokio::test]
async fn logout_revokes_every_session_and_clears_cookies() {
    let (store, state) = state_with(ProviderRegistry::new());
    let app = app(&state);
    let first = register_alice(&app).await;
    let second = json_body(
        send(
            &app,
            post_json(
                "/auth/login",
                json!({"email": "alice@example.com", "password": "correct horse"}),
            ),
        )
        .await,
    )
    .await;

    let req = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", second["accessToken"].as_str().unwrap()),
        )
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = set_cookies(&resp);
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));

    for body in [&first, &second] {
        let resp = send(
            &app,
            post_json(
                "/auth/refresh-token",
                json!({"refreshToken": body["refreshToken"]}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["code"], "TOKEN_VERSION_MISMATCH");
    }

    let id = first["user"]["id"].as_str().unwrap();
    assert_eq!(store.get(id).await.unwrap().unwrap().credential_version, 2);
}

#[tokio::test]
async fn logout_requires_authentication() {
    let (_, state) = state_with(ProviderRegistry::new());
    let app = app(&state);
    let req = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_accepts_bearer_or_cookie() {
    let (_, state) = state_with(ProviderRegistry::new());
    let app = app(&state);
    let tokens = register_alice(&app).await;
    let access = tokens["accessToken"].as_str().unwrap();

    let bearer = Request::builder()
        .uri("/auth/profile")
        .header(header::AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, bearer).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["username"], "alice");
    assert!(json["lastLogin"].is_string());

    let cookie = Request::builder()
        .uri("/auth/profile")
        .header(header::COOKIE, format!("tessera_access={access}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, cookie).await.status(), StatusCode::OK);

    // A refresh token is not an access token.
    let wrong = Request::builder()
        .uri("/auth/profile")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", tokens["refreshToken"].as_str().unwrap()),
        )
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, wrong).await.status(), StatusCode::UNAUTHORIZED);
}
