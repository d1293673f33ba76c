// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod station;
pub mod user;

pub use station::{Brand, Coordinates, FuelPrice, FuelPrices, FuelType, Station};
pub use user::{NotificationPrefs, Preferences, PriceAlert, User, UserProfile};
