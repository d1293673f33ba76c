// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users: profile, favorites and price alerts.
//!
//! Favorites and alerts are embedded in the user document, so every write
//! here is read-modify-save of the whole user. A concurrent write (including
//! the alert evaluator stamping `lastTriggered`) surfaces as 409.

use crate::error::{field_errors, AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{FuelType, Preferences, PriceAlert, Station, User, UserProfile};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use futures_util::{stream, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Concurrent station lookups when resolving favorites.
const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// User routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/profile", get(get_profile).put(update_profile))
        .route("/api/users/favorites", get(list_favorites))
        .route(
            "/api/users/favorites/{station_id}",
            post(add_favorite).delete(remove_favorite),
        )
        .route("/api/users/alerts", get(list_alerts).post(create_alert))
        .route(
            "/api/users/alerts/{alert_id}",
            put(update_alert).delete(delete_alert),
        )
}

async fn load_user(state: &AppState, auth: &AuthUser) -> Result<User> {
    state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.user_id)))
}

async fn require_station(state: &AppState, station_id: &str) -> Result<Station> {
    state
        .db
        .get_station(station_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Station {} not found", station_id)))
}

async fn save(state: &AppState, mut user: User) -> Result<User> {
    user.updated_at = Utc::now();
    state.db.save_user(&user).await
}

// ─── Profile ─────────────────────────────────────────────────

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    let user = load_user(&state, &auth).await?;
    Ok(Json(UserProfile::from(&user)))
}

/// Fields a user may change on their own profile. Anything else in the
/// body is ignored.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub preferences: Option<Preferences>,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>> {
    req.validate()?;
    let mut user = load_user(&state, &auth).await?;

    if let Some(first) = req.first_name {
        user.first_name = first.trim().to_string();
    }
    if let Some(last) = req.last_name {
        user.last_name = last.trim().to_string();
    }
    if let Some(phone) = req.phone {
        user.phone = Some(phone).filter(|p| !p.trim().is_empty());
    }
    if let Some(preferences) = req.preferences {
        user.preferences = preferences;
    }

    let user = save(&state, user).await?;
    Ok(Json(UserProfile::from(&user)))
}

// ─── Favorites ───────────────────────────────────────────────

/// Favorite stations, in the order added. Ids that no longer resolve are
/// skipped.
async fn list_favorites(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Station>>> {
    let user = load_user(&state, &auth).await?;

    let resolved = stream::iter(user.favorites)
        .map(|id| {
            let db = state.db.clone();
            async move { db.get_station(&id).await }
        })
        .buffered(MAX_CONCURRENT_LOOKUPS)
        .collect::<Vec<Result<Option<Station>>>>()
        .await
        .into_iter()
        .collect::<Result<Vec<Option<Station>>>>()?;

    Ok(Json(resolved.into_iter().flatten().collect()))
}

async fn add_favorite(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(station_id): Path<String>,
) -> Result<Json<Vec<String>>> {
    require_station(&state, &station_id).await?;
    let mut user = load_user(&state, &auth).await?;

    if user.favorites.contains(&station_id) {
        return Ok(Json(user.favorites));
    }

    user.favorites.push(station_id);
    let user = save(&state, user).await?;
    Ok(Json(user.favorites))
}

async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(station_id): Path<String>,
) -> Result<Json<Vec<String>>> {
    let mut user = load_user(&state, &auth).await?;

    let before = user.favorites.len();
    user.favorites.retain(|id| id != &station_id);
    if user.favorites.len() == before {
        return Err(AppError::NotFound(format!(
            "Station {} is not a favorite",
            station_id
        )));
    }

    let user = save(&state, user).await?;
    Ok(Json(user.favorites))
}

// ─── Alerts ──────────────────────────────────────────────────

async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<PriceAlert>>> {
    let user = load_user(&state, &auth).await?;
    Ok(Json(user.alerts))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub station_id: String,
    pub fuel_type: String,
    #[validate(range(exclusive_min = 0.0, max = 100.0, message = "must be a positive price"))]
    pub target_price: f64,
}

async fn create_alert(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<PriceAlert>)> {
    let mut fields = req.validate().err().map(|e| field_errors(&e)).unwrap_or_default();
    let fuel_type = req.fuel_type.parse::<FuelType>();
    if let Err(e) = &fuel_type {
        fields.entry("fuelType".to_string()).or_default().push(e.clone());
    }
    let (Ok(fuel_type), true) = (fuel_type, fields.is_empty()) else {
        return Err(AppError::Validation(fields));
    };

    // Nothing is written unless the station resolves.
    require_station(&state, &req.station_id).await?;
    let mut user = load_user(&state, &auth).await?;

    if user.has_alert_for(&req.station_id, fuel_type) {
        return Err(AppError::BadRequest(format!(
            "An alert for {} at station {} already exists",
            fuel_type, req.station_id
        )));
    }

    let alert = PriceAlert {
        id: uuid::Uuid::new_v4().to_string(),
        station_id: req.station_id,
        fuel_type,
        target_price: req.target_price,
        is_active: true,
        last_triggered: None,
        created_at: Utc::now(),
    };
    user.alerts.push(alert.clone());
    save(&state, user).await?;

    tracing::info!(
        user_id = %auth.user_id,
        alert_id = %alert.id,
        station_id = %alert.station_id,
        fuel_type = %alert.fuel_type,
        "Price alert created"
    );
    Ok((StatusCode::CREATED, Json(alert)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlertRequest {
    #[validate(range(exclusive_min = 0.0, max = 100.0, message = "must be a positive price"))]
    pub target_price: Option<f64>,
    pub is_active: Option<bool>,
}

async fn update_alert(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(alert_id): Path<String>,
    Json(req): Json<UpdateAlertRequest>,
) -> Result<Json<PriceAlert>> {
    req.validate()?;
    let mut user = load_user(&state, &auth).await?;

    let alert = user
        .find_alert_mut(&alert_id)
        .ok_or_else(|| AppError::NotFound(format!("Alert {} not found", alert_id)))?;
    if let Some(target) = req.target_price {
        alert.target_price = target;
    }
    if let Some(active) = req.is_active {
        alert.is_active = active;
    }
    let updated = alert.clone();

    save(&state, user).await?;
    Ok(Json(updated))
}

async fn delete_alert(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(alert_id): Path<String>,
) -> Result<StatusCode> {
    let mut user = load_user(&state, &auth).await?;

    if user.find_alert(&alert_id).is_none() {
        return Err(AppError::NotFound(format!("Alert {} not found", alert_id)));
    }
    user.alerts.retain(|a| a.id != alert_id);

    save(&state, user).await?;
    Ok(StatusCode::NO_CONTENT)
}
