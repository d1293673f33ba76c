// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.
//!
//! Both register and login answer with the session token in the body and
//! also set it as an HTTP-only cookie, so browser and API clients work the
//! same way.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::models::{User, UserProfile};
use crate::services::password::{
    hash_password, validate_password_strength, verify_password, PasswordError,
};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn password_error(e: PasswordError) -> AppError {
    match e {
        PasswordError::TooShort(_) => AppError::invalid_field("password", e.to_string()),
        PasswordError::Hash(_) => AppError::Internal(anyhow::anyhow!("{}", e)),
    }
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    // Plain-HTTP cookies only for a local frontend.
    let secure = !state.config.frontend_url.starts_with("http://");
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64))
        .build()
}

fn issue_session(state: &AppState, jar: CookieJar, user: &User) -> Result<(CookieJar, AuthResponse)> {
    let token = create_jwt(&user.id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;
    let jar = jar.add(session_cookie(state, token.clone()));
    Ok((
        jar,
        AuthResponse {
            token,
            user: UserProfile::from(user),
        },
    ))
}

/// Create an account and start a session.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    req.validate()?;
    validate_password_strength(&req.password).map_err(password_error)?;

    let email = normalize_email(&req.email);
    let password_hash = hash_password(&req.password).map_err(password_error)?;
    let now = Utc::now();

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        password_hash,
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        phone: req.phone.filter(|p| !p.trim().is_empty()),
        preferences: Default::default(),
        favorites: vec![],
        alerts: vec![],
        created_at: now,
        updated_at: now,
        version: 0,
    };

    // The store rejects a taken email with Conflict.
    let user = state.db.insert_user(&user).await?;
    tracing::info!(user_id = %user.id, "User registered");

    let (jar, body) = issue_session(&state, jar, &user)?;
    Ok((StatusCode::CREATED, jar, Json(body)))
}

/// Check credentials and start a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    req.validate()?;

    let email = normalize_email(&req.email);
    let Some(user) = state.db.get_user_by_email(&email).await? else {
        // Burn a hash so unknown emails take as long as wrong passwords.
        let _ = hash_password(&req.password);
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&req.password, &user.password_hash).map_err(password_error)? {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!(user_id = %user.id, "User logged in");
    let (jar, body) = issue_session(&state, jar, &user)?;
    Ok((jar, Json(body)))
}

/// Clear the session cookie. Bearer tokens simply expire.
async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    // An explicit expired cookie, so the browser drops it even when this
    // request didn't carry one.
    let expired = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build();
    (jar.add(expired), StatusCode::NO_CONTENT)
}
