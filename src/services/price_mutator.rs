// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduled price drift.
//!
//! Each pass nudges every active station's prices by a small random amount,
//! standing in for a real scrape. One draw per station is applied to all of
//! its fuels, so a station's grades always move together.

use crate::db::Store;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;

use crate::models::{FuelType, Station};

/// Largest absolute change applied to a price in one pass.
pub const MAX_PERTURBATION: f64 = 0.10;

/// Outcome of one mutation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationReport {
    pub stations_updated: u32,
    pub stations_failed: u32,
}

/// Apply one perturbation to every fuel the station sells.
///
/// Prices are rounded to agorot (two decimals) and never go below the
/// fuel's floor. Returns the number of prices changed.
pub fn perturb_station(station: &mut Station, delta: f64, now: DateTime<Utc>) -> usize {
    let mut changed = 0;
    for fuel in FuelType::ALL {
        if let Some(entry) = station.prices.get_mut(fuel) {
            entry.price = clamp_price(fuel, entry.price + delta);
            entry.last_updated = now;
            changed += 1;
        }
    }
    station.last_scraped = Some(now);
    station.updated_at = now;
    changed
}

fn clamp_price(fuel: FuelType, raw: f64) -> f64 {
    let rounded = (raw * 100.0).round() / 100.0;
    rounded.max(fuel.floor())
}

/// Uniform draw from the symmetric perturbation range.
pub fn draw_perturbation() -> f64 {
    rand::rng().random_range(-MAX_PERTURBATION..=MAX_PERTURBATION)
}

/// Runs mutation passes over the station store.
pub struct PriceMutator {
    db: Arc<dyn Store>,
}

impl PriceMutator {
    pub fn new(db: Arc<dyn Store>) -> Self {
        Self { db }
    }

    /// Mutate all active stations with random draws.
    pub async fn run(&self, now: DateTime<Utc>) -> MutationReport {
        self.run_with(now, draw_perturbation).await
    }

    /// Mutate all active stations, taking one value from `draw` per station.
    ///
    /// Each station is saved on its own; a failed save is logged and
    /// counted, and the pass moves on.
    pub async fn run_with<F>(&self, now: DateTime<Utc>, mut draw: F) -> MutationReport
    where
        F: FnMut() -> f64 + Send,
    {
        let mut report = MutationReport::default();

        let stations = match self.db.list_active_stations().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load stations for price update");
                return report;
            }
        };

        tracing::debug!(count = stations.len(), "Updating station prices");

        for mut station in stations {
            let delta = draw();
            let changed = perturb_station(&mut station, delta, now);

            match self.db.save_station(&station).await {
                Ok(_) => {
                    tracing::debug!(
                        station_id = %station.id,
                        delta,
                        prices_changed = changed,
                        "Station prices updated"
                    );
                    report.stations_updated += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        station_id = %station.id,
                        error = %e,
                        "Failed to save station prices"
                    );
                    report.stations_failed += 1;
                }
            }
        }

        report
    }
}
