// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fuel station model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Fuel grades tracked per station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum FuelType {
    #[serde(rename = "gasoline95")]
    Gasoline95,
    #[serde(rename = "gasoline98")]
    Gasoline98,
    #[serde(rename = "diesel")]
    Diesel,
}

impl FuelType {
    pub const ALL: [FuelType; 3] = [FuelType::Gasoline95, FuelType::Gasoline98, FuelType::Diesel];

    /// Minimum price the scheduled mutation will ever write for this fuel.
    pub fn floor(self) -> f64 {
        match self {
            FuelType::Gasoline95 => 6.0,
            FuelType::Gasoline98 => 6.2,
            FuelType::Diesel => 5.8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FuelType::Gasoline95 => "gasoline95",
            FuelType::Gasoline98 => "gasoline98",
            FuelType::Diesel => "diesel",
        }
    }

    /// Human-readable label used in notification emails.
    pub fn label(self) -> &'static str {
        match self {
            FuelType::Gasoline95 => "Gasoline 95",
            FuelType::Gasoline98 => "Gasoline 98",
            FuelType::Diesel => "Diesel",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FuelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gasoline95" => Ok(FuelType::Gasoline95),
            "gasoline98" => Ok(FuelType::Gasoline98),
            "diesel" => Ok(FuelType::Diesel),
            other => Err(format!("Unknown fuel type: {}", other)),
        }
    }
}

/// Station brands accepted by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Brand {
    Paz,
    Delek,
    Sonol,
    #[serde(rename = "Dor Alon")]
    DorAlon,
    Ten,
    Yellow,
    Other,
}

impl Brand {
    pub fn as_str(self) -> &'static str {
        match self {
            Brand::Paz => "Paz",
            Brand::Delek => "Delek",
            Brand::Sonol => "Sonol",
            Brand::DorAlon => "Dor Alon",
            Brand::Ten => "Ten",
            Brand::Yellow => "Yellow",
            Brand::Other => "Other",
        }
    }
}

impl FromStr for Brand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Paz" => Ok(Brand::Paz),
            "Delek" => Ok(Brand::Delek),
            "Sonol" => Ok(Brand::Sonol),
            "Dor Alon" => Ok(Brand::DorAlon),
            "Ten" => Ok(Brand::Ten),
            "Yellow" => Ok(Brand::Yellow),
            "Other" => Ok(Brand::Other),
            other => Err(format!("Unknown brand: {}", other)),
        }
    }
}

/// Geographic position of a station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A single fuel price with its own update stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FuelPrice {
    pub price: f64,
    pub last_updated: DateTime<Utc>,
}

/// Per-fuel prices. A station may not sell every grade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FuelPrices {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gasoline95: Option<FuelPrice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gasoline98: Option<FuelPrice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diesel: Option<FuelPrice>,
}

impl FuelPrices {
    pub fn get(&self, fuel: FuelType) -> Option<&FuelPrice> {
        match fuel {
            FuelType::Gasoline95 => self.gasoline95.as_ref(),
            FuelType::Gasoline98 => self.gasoline98.as_ref(),
            FuelType::Diesel => self.diesel.as_ref(),
        }
    }

    pub fn get_mut(&mut self, fuel: FuelType) -> Option<&mut FuelPrice> {
        match fuel {
            FuelType::Gasoline95 => self.gasoline95.as_mut(),
            FuelType::Gasoline98 => self.gasoline98.as_mut(),
            FuelType::Diesel => self.diesel.as_mut(),
        }
    }

    /// Set (or replace) the price for a fuel, stamping it with `now`.
    pub fn set(&mut self, fuel: FuelType, price: f64, now: DateTime<Utc>) {
        let slot = match fuel {
            FuelType::Gasoline95 => &mut self.gasoline95,
            FuelType::Gasoline98 => &mut self.gasoline98,
            FuelType::Diesel => &mut self.diesel,
        };
        *slot = Some(FuelPrice {
            price,
            last_updated: now,
        });
    }

    /// Current price for a fuel, if the station sells it.
    pub fn price_of(&self, fuel: FuelType) -> Option<f64> {
        self.get(fuel).map(|p| p.price)
    }
}

/// Stored station record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Station {
    /// Opaque id (also used as document ID)
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub location: Coordinates,
    pub brand: Brand,
    #[serde(default)]
    pub prices: FuelPrices,
    /// Day name -> opening range, e.g. "sunday" -> "06:00-22:00"
    #[serde(default)]
    pub opening_hours: BTreeMap<String, String>,
    #[serde(default)]
    pub services: Vec<String>,
    pub is_active: bool,
    /// When prices were last refreshed (scheduled job or manual update)
    #[serde(default)]
    pub last_scraped: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped by the store on every save.
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub version: u64,
}

impl Station {
    /// Great-circle distance in kilometres from `origin`.
    pub fn distance_km(&self, origin: Coordinates) -> f64 {
        use geo::{Distance, Haversine, Point};

        let here = Point::new(self.location.lng, self.location.lat);
        let there = Point::new(origin.lng, origin.lat);
        Haversine.distance(here, there) / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuel_type_floors() {
        assert_eq!(FuelType::Gasoline95.floor(), 6.0);
        assert_eq!(FuelType::Gasoline98.floor(), 6.2);
        assert_eq!(FuelType::Diesel.floor(), 5.8);
    }

    #[test]
    fn test_fuel_type_round_trips_through_str() {
        for fuel in FuelType::ALL {
            assert_eq!(fuel.as_str().parse::<FuelType>().unwrap(), fuel);
        }
        assert!("kerosene".parse::<FuelType>().is_err());
    }

    #[test]
    fn test_brand_serializes_display_name() {
        let json = serde_json::to_string(&Brand::DorAlon).unwrap();
        assert_eq!(json, "\"Dor Alon\"");
        assert_eq!("Dor Alon".parse::<Brand>().unwrap(), Brand::DorAlon);
        assert!("Shell".parse::<Brand>().is_err());
    }

    #[test]
    fn test_prices_skip_missing_fuels_in_json() {
        let mut prices = FuelPrices::default();
        prices.set(FuelType::Diesel, 6.4, Utc::now());

        let json = serde_json::to_value(&prices).unwrap();
        assert!(json.get("diesel").is_some());
        assert!(json.get("gasoline95").is_none());
        assert_eq!(prices.price_of(FuelType::Diesel), Some(6.4));
        assert_eq!(prices.price_of(FuelType::Gasoline98), None);
    }

    #[test]
    fn test_distance_km_tel_aviv_to_jerusalem() {
        let now = Utc::now();
        let station = Station {
            id: "s1".to_string(),
            name: "Test".to_string(),
            address: "1 Herzl St".to_string(),
            city: "Tel Aviv".to_string(),
            location: Coordinates {
                lat: 32.0853,
                lng: 34.7818,
            },
            brand: Brand::Paz,
            prices: FuelPrices::default(),
            opening_hours: BTreeMap::new(),
            services: vec![],
            is_active: true,
            last_scraped: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let jerusalem = Coordinates {
            lat: 31.7683,
            lng: 35.2137,
        };
        let d = station.distance_km(jerusalem);
        assert!((50.0..60.0).contains(&d), "unexpected distance {}", d);
    }
}
