// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Price alert evaluation.
//!
//! Runs after every price mutation pass. For each subscribed user, alerts
//! whose station price is at or below target fire at most once per
//! cooldown window; the user gets one email per pass covering all of them.

use crate::db::Store;
use crate::models::{Station, User};
use crate::services::notifier::{Notifier, TriggeredAlert};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    pub users_evaluated: u32,
    pub alerts_triggered: u32,
    pub notifications_sent: u32,
    pub notifications_failed: u32,
    pub users_failed: u32,
}

/// Saves of one user's trigger stamps before giving up on conflicts.
const MAX_SAVE_ATTEMPTS: u32 = 3;

/// Stations already fetched during this pass, including misses.
type StationCache = HashMap<String, Option<Station>>;

/// Mark every alert of `user` that fires at `now` and describe it.
///
/// Inactive alerts, alerts whose station is gone and alerts on a fuel the
/// station doesn't sell are skipped. Fired alerts get `last_triggered = now`.
pub fn collect_triggered(
    user: &mut User,
    stations: &HashMap<String, Option<Station>>,
    now: DateTime<Utc>,
) -> Vec<TriggeredAlert> {
    let mut fired = Vec::new();

    for alert in user.alerts.iter_mut().filter(|a| a.is_active) {
        let Some(Some(station)) = stations.get(&alert.station_id) else {
            continue;
        };
        let Some(current_price) = station.prices.price_of(alert.fuel_type) else {
            continue;
        };

        if alert.should_trigger(current_price, now) {
            alert.last_triggered = Some(now);
            fired.push(TriggeredAlert {
                alert_id: alert.id.clone(),
                station_name: station.name.clone(),
                address: station.address.clone(),
                fuel_type: alert.fuel_type,
                current_price,
                target_price: alert.target_price,
            });
        }
    }

    fired
}

/// Compares user alerts against current station prices.
pub struct AlertEvaluator {
    db: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl AlertEvaluator {
    pub fn new(db: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    /// Evaluate every subscribed user's alerts.
    ///
    /// Per user: notify once if anything fired, then save the user so the
    /// new `last_triggered` stamps stick. A failed send does not undo the
    /// stamps; a failed save is counted and the pass continues.
    pub async fn run(&self, now: DateTime<Utc>) -> EvaluationReport {
        let mut report = EvaluationReport::default();

        let users = match self.db.list_alert_subscribers().await {
            Ok(u) => u,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load alert subscribers");
                return report;
            }
        };

        let mut stations = StationCache::new();

        for mut user in users {
            report.users_evaluated += 1;

            if let Err(e) = self.prefetch_stations(&user, &mut stations).await {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to load alert stations");
                report.users_failed += 1;
                continue;
            }

            let fired = collect_triggered(&mut user, &stations, now);
            if fired.is_empty() {
                continue;
            }

            report.alerts_triggered += fired.len() as u32;
            tracing::info!(user_id = %user.id, alerts = fired.len(), "Price alerts triggered");

            match self.notifier.notify(&user, &fired).await {
                Ok(()) => report.notifications_sent += 1,
                Err(e) => {
                    tracing::warn!(user_id = %user.id, error = %e, "Failed to send price alert");
                    report.notifications_failed += 1;
                }
            }

            let user_id = user.id.clone();
            if let Err(e) = self.save_stamps(user, &fired, now).await {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Failed to save alert trigger timestamps"
                );
                report.users_failed += 1;
            }
        }

        report
    }

    /// Persist `last_triggered` for the fired alerts.
    ///
    /// The email has already gone out, so a version conflict must not drop
    /// the stamps: re-read the user, stamp the fired alerts that still
    /// exist and try again.
    async fn save_stamps(
        &self,
        mut user: User,
        fired: &[TriggeredAlert],
        now: DateTime<Utc>,
    ) -> Result<(), crate::error::AppError> {
        let mut attempt = 1;
        loop {
            match self.db.save_user(&user).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_conflict() && attempt < MAX_SAVE_ATTEMPTS => {
                    tracing::debug!(
                        user_id = %user.id,
                        attempt,
                        "User changed during evaluation, retrying"
                    );
                    attempt += 1;
                    let Some(fresh) = self.db.get_user(&user.id).await? else {
                        return Ok(());
                    };
                    user = fresh;
                    for triggered in fired {
                        if let Some(alert) = user.find_alert_mut(&triggered.alert_id) {
                            alert.last_triggered = Some(now);
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Load any stations referenced by the user's alerts that aren't cached yet.
    async fn prefetch_stations(
        &self,
        user: &User,
        cache: &mut StationCache,
    ) -> Result<(), crate::error::AppError> {
        for alert in user.alerts.iter().filter(|a| a.is_active) {
            if cache.contains_key(&alert.station_id) {
                continue;
            }
            let station = self.db.get_station(&alert.station_id).await?;
            cache.insert(alert.station_id.clone(), station);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Brand, Coordinates, FuelPrices, FuelType, PriceAlert};
    use chrono::Duration;

    fn station(id: &str, diesel: f64) -> Station {
        let now = Utc::now();
        let mut prices = FuelPrices::default();
        prices.set(FuelType::Diesel, diesel, now);
        Station {
            id: id.to_string(),
            name: format!("Station {}", id),
            address: "1 Herzl St".to_string(),
            city: "Tel Aviv".to_string(),
            location: Coordinates {
                lat: 32.08,
                lng: 34.78,
            },
            brand: Brand::DorAlon,
            prices,
            opening_hours: Default::default(),
            services: vec![],
            is_active: true,
            last_scraped: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    fn alert(id: &str, station_id: &str, target: f64) -> PriceAlert {
        PriceAlert {
            id: id.to_string(),
            station_id: station_id.to_string(),
            fuel_type: FuelType::Diesel,
            target_price: target,
            is_active: true,
            last_triggered: None,
            created_at: Utc::now(),
        }
    }

    fn user_with(alerts: Vec<PriceAlert>) -> User {
        let now = Utc::now();
        User {
            id: "u1".to_string(),
            email: "noa@example.com".to_string(),
            password_hash: String::new(),
            first_name: "Noa".to_string(),
            last_name: "Cohen".to_string(),
            phone: None,
            preferences: Default::default(),
            favorites: vec![],
            alerts,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    fn cache(stations: Vec<Station>) -> HashMap<String, Option<Station>> {
        stations
            .into_iter()
            .map(|s| (s.id.clone(), Some(s)))
            .collect()
    }

    #[test]
    fn test_fires_once_and_stamps_time() {
        let now = Utc::now();
        let mut user = user_with(vec![alert("a1", "s1", 6.30)]);
        let stations = cache(vec![station("s1", 6.20)]);

        let fired = collect_triggered(&mut user, &stations, now);

        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].alert_id, "a1");
        assert_eq!(fired[0].current_price, 6.20);
        assert_eq!(fired[0].target_price, 6.30);
        assert_eq!(user.alerts[0].last_triggered, Some(now));
    }

    #[test]
    fn test_price_above_target_does_not_fire() {
        let mut user = user_with(vec![alert("a1", "s1", 6.30)]);
        let stations = cache(vec![station("s1", 6.40)]);

        assert!(collect_triggered(&mut user, &stations, Utc::now()).is_empty());
        assert!(user.alerts[0].last_triggered.is_none());
    }

    #[test]
    fn test_recent_trigger_is_suppressed() {
        let now = Utc::now();
        let mut a = alert("a1", "s1", 6.30);
        a.last_triggered = Some(now - Duration::hours(3));
        let mut user = user_with(vec![a]);
        let stations = cache(vec![station("s1", 6.00)]);

        assert!(collect_triggered(&mut user, &stations, now).is_empty());
        assert_eq!(user.alerts[0].last_triggered, Some(now - Duration::hours(3)));
    }

    #[test]
    fn test_price_parked_at_target_refires_after_cooldown() {
        // No hysteresis: an unchanged price fires again once the window passes.
        let start = Utc::now();
        let mut user = user_with(vec![alert("a1", "s1", 6.30)]);
        let stations = cache(vec![station("s1", 6.30)]);

        assert_eq!(collect_triggered(&mut user, &stations, start).len(), 1);
        let later = start + Duration::hours(12);
        assert!(collect_triggered(&mut user, &stations, later).is_empty());
        let next_day = start + Duration::hours(25);
        assert_eq!(collect_triggered(&mut user, &stations, next_day).len(), 1);
    }

    #[test]
    fn test_skips_inactive_missing_and_unsold() {
        let mut inactive = alert("a1", "s1", 10.0);
        inactive.is_active = false;
        let dangling = alert("a2", "gone", 10.0);
        let mut unsold = alert("a3", "s1", 10.0);
        unsold.fuel_type = FuelType::Gasoline98;

        let mut user = user_with(vec![inactive, dangling, unsold]);
        let mut stations = cache(vec![station("s1", 6.0)]);
        stations.insert("gone".to_string(), None);

        assert!(collect_triggered(&mut user, &stations, Utc::now()).is_empty());
    }

    #[test]
    fn test_batches_multiple_alerts() {
        let mut user = user_with(vec![alert("a1", "s1", 6.30), alert("a2", "s2", 6.50)]);
        let stations = cache(vec![station("s1", 6.20), station("s2", 6.45)]);

        let fired = collect_triggered(&mut user, &stations, Utc::now());
        assert_eq!(fired.len(), 2);
    }
}
