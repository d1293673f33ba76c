// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT validation tests: expiry, algorithm and signing key.

use axum::http::StatusCode;
use fuel_tracker::config::Config;
use fuel_tracker::middleware::auth::Claims;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::time::{SystemTime, UNIX_EPOCH};

mod common;
use common::{create_test_app, json_request, seed_user, send};

fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

fn token_with(sub: &str, iat: usize, exp: usize, alg: Algorithm, key: &[u8]) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        iat,
        exp,
    };
    encode(&Header::new(alg), &claims, &EncodingKey::from_secret(key)).unwrap()
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = create_test_app();
    let user = seed_user(&app.state, "expired@example.com").await;
    let key = Config::test_default().jwt_signing_key;

    let now = now_secs();
    // Well past the default 60s leeway.
    let token = token_with(&user.id, now - 7200, now - 3600, Algorithm::HS256, &key);

    let (status, _) = send(
        &app.router,
        json_request("GET", "/api/users/profile", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_key_rejected() {
    let app = create_test_app();
    let user = seed_user(&app.state, "wrongkey@example.com").await;

    let now = now_secs();
    let token = token_with(
        &user.id,
        now,
        now + 3600,
        Algorithm::HS256,
        b"not_the_configured_signing_key!!",
    );

    let (status, _) = send(
        &app.router,
        json_request("GET", "/api/users/profile", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_other_hmac_algorithm_rejected() {
    let app = create_test_app();
    let user = seed_user(&app.state, "hs512@example.com").await;
    let key = Config::test_default().jwt_signing_key;

    let now = now_secs();
    let token = token_with(&user.id, now, now + 3600, Algorithm::HS512, &key);

    let (status, _) = send(
        &app.router,
        json_request("GET", "/api/users/profile", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_scheme_rejected() {
    let app = create_test_app();
    let user = seed_user(&app.state, "basic@example.com").await;
    let token = common::create_test_jwt(&user.id);

    let request = axum::http::Request::builder()
        .uri("/api/users/profile")
        .header(axum::http::header::AUTHORIZATION, format!("Basic {}", token))
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
