// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Station listing and search.
//!
//! Firestore has no geo or substring queries, so filtering beyond the
//! active flag happens in memory over the fetched stations.

use crate::models::{Brand, Coordinates, FuelType, Station};
use std::cmp::Ordering;

/// Maximum stations returned by a listing.
pub const MAX_LIST_RESULTS: usize = 100;
/// Maximum stations returned by a search.
pub const MAX_SEARCH_RESULTS: usize = 20;
/// Radius used when a location is given without one.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Filters for a station listing.
#[derive(Debug, Clone)]
pub struct StationQuery {
    pub city: Option<String>,
    pub brand: Option<Brand>,
    /// Center and radius (km) of a geo filter
    pub near: Option<(Coordinates, f64)>,
    /// Fuel whose price orders the result
    pub sort_by: FuelType,
}

impl Default for StationQuery {
    fn default() -> Self {
        Self {
            city: None,
            brand: None,
            near: None,
            sort_by: FuelType::Gasoline95,
        }
    }
}

impl StationQuery {
    fn matches(&self, station: &Station) -> bool {
        if let Some(city) = &self.city {
            if !station.city.eq_ignore_ascii_case(city.trim()) {
                return false;
            }
        }
        if let Some(brand) = self.brand {
            if station.brand != brand {
                return false;
            }
        }
        if let Some((center, radius_km)) = self.near {
            if station.distance_km(center) > radius_km {
                return false;
            }
        }
        true
    }

    /// Filter, sort by price ascending and cap the result.
    ///
    /// Stations that don't sell the sort fuel go last.
    pub fn apply(&self, stations: Vec<Station>) -> Vec<Station> {
        let mut matched: Vec<Station> = stations
            .into_iter()
            .filter(|s| s.is_active && self.matches(s))
            .collect();

        let fuel = self.sort_by;
        matched.sort_by(|a, b| {
            match (a.prices.price_of(fuel), b.prices.price_of(fuel)) {
                (Some(pa), Some(pb)) => pa.partial_cmp(&pb).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
            .then_with(|| a.name.cmp(&b.name))
        });

        matched.truncate(MAX_LIST_RESULTS);
        matched
    }
}

/// Case-insensitive substring match on name, address or city.
pub fn search(stations: Vec<Station>, query: &str) -> Vec<Station> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    stations
        .into_iter()
        .filter(|s| s.is_active)
        .filter(|s| {
            s.name.to_lowercase().contains(&needle)
                || s.address.to_lowercase().contains(&needle)
                || s.city.to_lowercase().contains(&needle)
        })
        .take(MAX_SEARCH_RESULTS)
        .collect()
}
