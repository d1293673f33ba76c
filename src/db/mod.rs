// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Handlers and the price pipeline talk to a [`Store`]. Two backends exist:
//! Firestore for deployments and an in-memory map for local runs and tests.
//!
//! Saves are optimistic: a record carries the `version` it was read at, and
//! the store rejects the save with [`AppError::Conflict`] if someone else
//! saved in between. A successful save returns the record with its bumped
//! version.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Station, User};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const STATIONS: &str = "stations";
    pub const USERS: &str = "users";
}

/// Document store for stations and users.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Stations ────────────────────────────────────────────────

    /// All stations, active or not.
    async fn list_stations(&self) -> Result<Vec<Station>, AppError>;

    /// Stations with `is_active == true`.
    async fn list_active_stations(&self) -> Result<Vec<Station>, AppError>;

    async fn get_station(&self, id: &str) -> Result<Option<Station>, AppError>;

    /// Store a new station. Fails with `Conflict` if the id is taken.
    async fn insert_station(&self, station: &Station) -> Result<Station, AppError>;

    /// Version-checked write of an existing station.
    async fn save_station(&self, station: &Station) -> Result<Station, AppError>;

    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Look up a user by (lower-cased) email.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Store a new user. Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, user: &User) -> Result<User, AppError>;

    /// Version-checked write of an existing user.
    async fn save_user(&self, user: &User) -> Result<User, AppError>;

    /// Users with email notifications on and at least one active alert.
    async fn list_alert_subscribers(&self) -> Result<Vec<User>, AppError>;
}

/// Records saved with an optimistic version check.
pub trait Versioned: Clone {
    /// Name used in conflict messages ("Station", "User").
    const KIND: &'static str;

    fn id(&self) -> &str;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);

    /// Copy of `self` as it will be stored after a save over `stored`.
    fn next_version(&self, stored: u64) -> Self {
        let mut next = self.clone();
        next.set_version(stored + 1);
        next
    }
}

impl Versioned for Station {
    const KIND: &'static str = "Station";

    fn id(&self) -> &str {
        &self.id
    }
    fn version(&self) -> u64 {
        self.version
    }
    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Versioned for User {
    const KIND: &'static str = "User";

    fn id(&self) -> &str {
        &self.id
    }
    fn version(&self) -> u64 {
        self.version
    }
    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

/// Reject a save whose expected version is stale.
pub(crate) fn check_version<T: Versioned>(record: &T, stored: u64) -> Result<(), AppError> {
    if stored != record.version() {
        return Err(AppError::Conflict(format!(
            "{} {} was modified concurrently (expected version {}, found {})",
            T::KIND,
            record.id(),
            record.version(),
            stored
        )));
    }
    Ok(())
}
