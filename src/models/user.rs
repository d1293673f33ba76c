// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use crate::models::FuelType;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Minimum time between two notifications for the same alert.
pub const ALERT_COOLDOWN_HOURS: i64 = 24;

/// Notification toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NotificationPrefs {
    #[serde(default = "default_true")]
    pub email: bool,
    #[serde(default)]
    pub push: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            email: true,
            push: false,
        }
    }
}

/// User preference block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Preferences {
    #[serde(default)]
    pub default_city: Option<String>,
    #[serde(default)]
    pub preferred_fuel_type: Option<FuelType>,
    #[serde(default)]
    pub notifications: NotificationPrefs,
}

/// A price alert embedded in the user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PriceAlert {
    pub id: String,
    pub station_id: String,
    pub fuel_type: FuelType,
    pub target_price: f64,
    pub is_active: bool,
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PriceAlert {
    /// Whether this alert should fire for `current_price` at `now`.
    ///
    /// Fires when the price is at or below target and the alert has not
    /// fired within the cooldown window. There is no hysteresis: a price
    /// parked at the target fires again once per cooldown.
    pub fn should_trigger(&self, current_price: f64, now: DateTime<Utc>) -> bool {
        if !self.is_active || current_price > self.target_price {
            return false;
        }
        match self.last_triggered {
            None => true,
            Some(last) => now.signed_duration_since(last) > Duration::hours(ALERT_COOLDOWN_HOURS),
        }
    }
}

/// User profile stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque id (also used as document ID)
    pub id: String,
    /// Lower-cased, unique across users
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
    /// Favorite station ids, in the order they were added
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default)]
    pub alerts: Vec<PriceAlert>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped by the store on every save.
    #[serde(default)]
    pub version: u64,
}

impl User {
    /// Whether the alert evaluator should look at this user at all.
    pub fn wants_alert_emails(&self) -> bool {
        self.preferences.notifications.email && self.alerts.iter().any(|a| a.is_active)
    }

    pub fn find_alert(&self, alert_id: &str) -> Option<&PriceAlert> {
        self.alerts.iter().find(|a| a.id == alert_id)
    }

    pub fn find_alert_mut(&mut self, alert_id: &str) -> Option<&mut PriceAlert> {
        self.alerts.iter_mut().find(|a| a.id == alert_id)
    }

    pub fn has_alert_for(&self, station_id: &str, fuel_type: FuelType) -> bool {
        self.alerts
            .iter()
            .any(|a| a.station_id == station_id && a.fuel_type == fuel_type)
    }
}

/// User as returned by the API (no credential hash).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub preferences: Preferences,
    pub favorites: Vec<String>,
    pub alerts: Vec<PriceAlert>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            preferences: user.preferences.clone(),
            favorites: user.favorites.clone(),
            alerts: user.alerts.clone(),
            created_at: user.created_at,
        }
    }
}
