// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public station routes: listing, lookup, search and direct writes.

use crate::error::{field_errors, AppError, FieldErrors, Result};
use crate::models::{Brand, Coordinates, FuelType, Station};
use crate::services::stations::{self, StationQuery, DEFAULT_RADIUS_KM};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/stations", get(list_stations).post(create_station))
        .route("/api/stations/search/{query}", get(search_stations))
        .route("/api/stations/{id}", get(get_station).put(update_station))
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStationsParams {
    city: Option<String>,
    brand: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    /// Kilometres
    radius: Option<f64>,
    fuel_type: Option<String>,
}

impl ListStationsParams {
    fn into_query(self) -> Result<StationQuery> {
        let mut fields = FieldErrors::new();
        let mut query = StationQuery {
            city: self.city.filter(|c| !c.trim().is_empty()),
            ..Default::default()
        };

        if let Some(brand) = self.brand.filter(|b| !b.is_empty()) {
            match brand.parse::<Brand>() {
                Ok(b) => query.brand = Some(b),
                Err(e) => push(&mut fields, "brand", e),
            }
        }

        if let Some(fuel) = self.fuel_type.filter(|f| !f.is_empty()) {
            match fuel.parse::<FuelType>() {
                Ok(f) => query.sort_by = f,
                Err(e) => push(&mut fields, "fuelType", e),
            }
        }

        // The geo filter needs both coordinates; a lone one is ignored.
        if let (Some(lat), Some(lng)) = (self.lat, self.lng) {
            let center = Coordinates { lat, lng };
            check_coordinates(&center, &mut fields);
            let radius = self.radius.unwrap_or(DEFAULT_RADIUS_KM);
            if !radius.is_finite() || radius <= 0.0 {
                push(&mut fields, "radius", "must be a positive number of kilometres");
            }
            query.near = Some((center, radius));
        }

        if fields.is_empty() {
            Ok(query)
        } else {
            Err(AppError::Validation(fields))
        }
    }
}

/// List active stations, filtered and sorted by price.
async fn list_stations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListStationsParams>,
) -> Result<Json<Vec<Station>>> {
    let query = params.into_query()?;
    let stations = state.db.list_active_stations().await?;
    Ok(Json(query.apply(stations)))
}

async fn get_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Station>> {
    let station = state
        .db
        .get_station(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Station {} not found", id)))?;
    Ok(Json(station))
}

async fn search_stations(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
) -> Result<Json<Vec<Station>>> {
    let stations = state.db.list_active_stations().await?;
    Ok(Json(stations::search(stations, &query)))
}

// ─── Writes ──────────────────────────────────────────────────

/// Per-fuel prices in a request body. Absent fuels are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct PricesInput {
    gasoline95: Option<f64>,
    gasoline98: Option<f64>,
    diesel: Option<f64>,
}

impl PricesInput {
    fn entries(&self) -> impl Iterator<Item = (FuelType, f64)> + '_ {
        [
            (FuelType::Gasoline95, self.gasoline95),
            (FuelType::Gasoline98, self.gasoline98),
            (FuelType::Diesel, self.diesel),
        ]
        .into_iter()
        .filter_map(|(fuel, price)| price.map(|p| (fuel, p)))
    }

    fn check(&self, fields: &mut FieldErrors) {
        for (fuel, price) in self.entries() {
            if !price.is_finite() || price < 0.0 {
                push(fields, &format!("prices.{}", fuel), "must be a non-negative number");
            }
        }
    }

    /// Set every supplied price, stamped with `now`.
    fn merge_into(&self, station: &mut Station, now: DateTime<Utc>) {
        for (fuel, price) in self.entries() {
            station.prices.set(fuel, price, now);
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStationRequest {
    #[validate(length(min = 1, max = 200, message = "is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 300, message = "is required"))]
    pub address: String,
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub city: String,
    pub location: Option<Coordinates>,
    pub brand: String,
    #[serde(default)]
    pub prices: PricesInput,
    #[serde(default)]
    pub opening_hours: BTreeMap<String, String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStationRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[serde(default)]
    pub prices: PricesInput,
    pub opening_hours: Option<BTreeMap<String, String>>,
    pub services: Option<Vec<String>>,
    pub is_active: Option<bool>,
    /// Version the client last read; a mismatch is a conflict.
    pub version: Option<u64>,
}

async fn create_station(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStationRequest>,
) -> Result<(StatusCode, Json<Station>)> {
    let mut fields = req.validate().err().map(|e| field_errors(&e)).unwrap_or_default();

    let brand = req.brand.parse::<Brand>();
    if let Err(e) = &brand {
        push(&mut fields, "brand", e.clone());
    }
    match &req.location {
        Some(location) => check_coordinates(location, &mut fields),
        None => push(&mut fields, "location", "is required"),
    }
    req.prices.check(&mut fields);

    let (Ok(brand), Some(location), true) = (brand, req.location, fields.is_empty()) else {
        return Err(AppError::Validation(fields));
    };

    let now = Utc::now();
    let mut station = Station {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        address: req.address.trim().to_string(),
        city: req.city.trim().to_string(),
        location,
        brand,
        prices: Default::default(),
        opening_hours: req.opening_hours,
        services: req.services,
        is_active: req.is_active,
        last_scraped: None,
        created_at: now,
        updated_at: now,
        version: 0,
    };
    req.prices.merge_into(&mut station, now);

    let station = state.db.insert_station(&station).await?;
    tracing::info!(station_id = %station.id, name = %station.name, "Station created");

    Ok((StatusCode::CREATED, Json(station)))
}

/// Merge a partial update into a station.
///
/// Prices written here skip the floor; only the scheduled drift clamps.
async fn update_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStationRequest>,
) -> Result<Json<Station>> {
    let mut fields = req.validate().err().map(|e| field_errors(&e)).unwrap_or_default();
    req.prices.check(&mut fields);
    if !fields.is_empty() {
        return Err(AppError::Validation(fields));
    }

    let mut station = state
        .db
        .get_station(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Station {} not found", id)))?;

    if let Some(expected) = req.version {
        if expected != station.version {
            return Err(AppError::Conflict(format!(
                "Station {} is at version {}, not {}",
                id, station.version, expected
            )));
        }
    }

    let now = Utc::now();
    if let Some(name) = req.name {
        station.name = name.trim().to_string();
    }
    if let Some(address) = req.address {
        station.address = address.trim().to_string();
    }
    if let Some(city) = req.city {
        station.city = city.trim().to_string();
    }
    if let Some(hours) = req.opening_hours {
        station.opening_hours = hours;
    }
    if let Some(services) = req.services {
        station.services = services;
    }
    if let Some(active) = req.is_active {
        station.is_active = active;
    }
    req.prices.merge_into(&mut station, now);
    station.last_scraped = Some(now);
    station.updated_at = now;

    let station = state.db.save_station(&station).await?;
    tracing::info!(station_id = %station.id, version = station.version, "Station updated");

    Ok(Json(station))
}

// ─── Helpers ─────────────────────────────────────────────────

fn push(fields: &mut FieldErrors, field: &str, message: impl Into<String>) {
    fields
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

fn check_coordinates(c: &Coordinates, fields: &mut FieldErrors) {
    if !(-90.0..=90.0).contains(&c.lat) {
        push(fields, "location.lat", "must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&c.lng) {
        push(fields, "location.lng", "must be between -180 and 180");
    }
}
