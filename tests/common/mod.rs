// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use fuel_tracker::config::Config;
use fuel_tracker::db::{FirestoreDb, MemoryStore, Store};
use fuel_tracker::models::{Brand, Coordinates, FuelPrices, FuelType, Station, User};
use fuel_tracker::routes::create_router;
use fuel_tracker::services::password::hash_password;
use fuel_tracker::services::{MailError, Notifier, TriggeredAlert};
use fuel_tracker::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Password given to every seeded user.
#[allow(dead_code)]
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Notifier that records every call instead of sending mail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, Vec<TriggeredAlert>)>>,
    fail: AtomicBool,
}

#[allow(dead_code)]
impl RecordingNotifier {
    /// (user id, alerts) for every notify call so far.
    pub fn calls(&self) -> Vec<(String, Vec<TriggeredAlert>)> {
        self.sent.lock().unwrap().clone()
    }

    /// Make subsequent sends fail (they are still recorded).
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user: &User, alerts: &[TriggeredAlert]) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap()
            .push((user.id.clone(), alerts.to_vec()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Build("simulated failure".to_string()));
        }
        Ok(())
    }
}

/// Everything a test needs to drive the app and inspect its effects.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Create a test app over a fresh in-memory store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let db: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = Arc::new(AppState::new(config, db, notifier.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        notifier,
    }
}

/// Create a session token for `user_id` with the test signing key.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str) -> String {
    fuel_tracker::middleware::auth::create_jwt(user_id, &Config::test_default().jwt_signing_key)
        .unwrap()
}

/// A station selling the given fuels, active, never scraped.
#[allow(dead_code)]
pub fn test_station(name: &str, city: &str, prices: &[(FuelType, f64)]) -> Station {
    let now = Utc::now();
    let mut fuel_prices = FuelPrices::default();
    for (fuel, price) in prices {
        fuel_prices.set(*fuel, *price, now);
    }
    Station {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        address: format!("1 Main St, {}", city),
        city: city.to_string(),
        location: Coordinates {
            lat: 32.0853,
            lng: 34.7818,
        },
        brand: Brand::Paz,
        prices: fuel_prices,
        opening_hours: Default::default(),
        services: vec![],
        is_active: true,
        last_scraped: None,
        created_at: now,
        updated_at: now,
        version: 0,
    }
}

#[allow(dead_code)]
pub async fn seed_station(state: &AppState, station: Station) -> Station {
    state.db.insert_station(&station).await.unwrap()
}

/// Insert a user with [`TEST_PASSWORD`] and default preferences.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, email: &str) -> User {
    let now = Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: email.to_string(),
        password_hash: hash_password(TEST_PASSWORD).unwrap(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        phone: None,
        preferences: Default::default(),
        favorites: vec![],
        alerts: vec![],
        created_at: now,
        updated_at: now,
        version: 0,
    };
    state.db.insert_user(&user).await.unwrap()
}

/// Build a request with an optional bearer token and JSON body.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a request and decode the JSON response body (`Null` if empty).
#[allow(dead_code)]
pub async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}
