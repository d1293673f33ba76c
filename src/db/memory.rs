// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for local development and tests.
//!
//! Mirrors the Firestore semantics the app relies on: whole-document
//! writes keyed by id, and version-checked saves. The version check and the
//! write happen under the map's entry lock, so concurrent saves of the same
//! document serialize. Emails are unique through an index map.

use crate::db::{check_version, Store, Versioned};
use crate::error::AppError;
use crate::models::{Station, User};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryStore {
    stations: DashMap<String, Station>,
    users: DashMap<String, User>,
    /// Lower-cased email -> user id. Claimed before the user is inserted.
    emails: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn save_in<T: Versioned>(map: &DashMap<String, T>, record: &T) -> Result<T, AppError> {
    match map.entry(record.id().to_string()) {
        Entry::Vacant(_) => Err(AppError::NotFound(format!(
            "{} {} not found",
            T::KIND,
            record.id()
        ))),
        Entry::Occupied(mut slot) => {
            check_version(record, slot.get().version())?;
            let next = record.next_version(slot.get().version());
            slot.insert(next.clone());
            Ok(next)
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_stations(&self) -> Result<Vec<Station>, AppError> {
        let mut stations: Vec<Station> = self.stations.iter().map(|s| s.value().clone()).collect();
        // DashMap iteration order is arbitrary; keep listings stable.
        stations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stations)
    }

    async fn list_active_stations(&self) -> Result<Vec<Station>, AppError> {
        let mut stations = self.list_stations().await?;
        stations.retain(|s| s.is_active);
        Ok(stations)
    }

    async fn get_station(&self, id: &str) -> Result<Option<Station>, AppError> {
        Ok(self.stations.get(id).map(|s| s.value().clone()))
    }

    async fn insert_station(&self, station: &Station) -> Result<Station, AppError> {
        match self.stations.entry(station.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "Station {} already exists",
                station.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(station.clone());
                Ok(station.clone())
            }
        }
    }

    async fn save_station(&self, station: &Station) -> Result<Station, AppError> {
        save_in(&self.stations, station)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let Some(id) = self.emails.get(&email.to_lowercase()).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    /// The email is claimed under its index entry lock, so two concurrent
    /// registrations for one address can't both succeed.
    async fn insert_user(&self, user: &User) -> Result<User, AppError> {
        let email = user.email.to_lowercase();
        match self.emails.entry(email.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::Conflict(format!(
                    "Email {} is already registered",
                    user.email
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }

        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => {
                self.emails.remove(&email);
                Err(AppError::Conflict(format!(
                    "User {} already exists",
                    user.id
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(user.clone())
            }
        }
    }

    async fn save_user(&self, user: &User) -> Result<User, AppError> {
        save_in(&self.users, user)
    }

    async fn list_alert_subscribers(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| u.wants_alert_emails())
            .map(|u| u.value().clone())
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }
}
