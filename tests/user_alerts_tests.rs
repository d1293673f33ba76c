// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Price alert CRUD tests.

use axum::http::StatusCode;
use fuel_tracker::models::FuelType;
use serde_json::json;

mod common;
use common::{create_test_app, create_test_jwt, json_request, seed_station, seed_user, send, test_station};

#[tokio::test]
async fn test_create_alert_for_unknown_station_is_404_and_no_write() {
    let app = create_test_app();
    let user = seed_user(&app.state, "alerts@example.com").await;
    let token = create_test_jwt(&user.id);

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/users/alerts",
            Some(&token),
            Some(json!({ "stationId": "ghost", "fuelType": "diesel", "targetPrice": 6.3 })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let stored = app.state.db.get_user(&user.id).await.unwrap().unwrap();
    assert!(stored.alerts.is_empty());
    assert_eq!(stored.version, user.version, "user must not be saved");
}

#[tokio::test]
async fn test_create_list_update_delete_alert() {
    let app = create_test_app();
    let user = seed_user(&app.state, "crud@example.com").await;
    let token = create_test_jwt(&user.id);
    let station = seed_station(
        &app.state,
        test_station("Paz Ayalon", "Tel Aviv", &[(FuelType::Diesel, 6.4)]),
    )
    .await;

    let (status, created) = send(
        &app.router,
        json_request(
            "POST",
            "/api/users/alerts",
            Some(&token),
            Some(json!({ "stationId": station.id, "fuelType": "diesel", "targetPrice": 6.3 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["isActive"], true);
    assert!(created["lastTriggered"].is_null());
    let alert_id = created["id"].as_str().unwrap().to_string();

    let (status, list) = send(
        &app.router,
        json_request("GET", "/api/users/alerts", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, updated) = send(
        &app.router,
        json_request(
            "PUT",
            &format!("/api/users/alerts/{}", alert_id),
            Some(&token),
            Some(json!({ "targetPrice": 6.1, "isActive": false })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["targetPrice"], 6.1);
    assert_eq!(updated["isActive"], false);

    let (status, _) = send(
        &app.router,
        json_request(
            "DELETE",
            &format!("/api/users/alerts/{}", alert_id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let stored = app.state.db.get_user(&user.id).await.unwrap().unwrap();
    assert!(stored.alerts.is_empty());
}

#[tokio::test]
async fn test_duplicate_station_fuel_is_rejected() {
    let app = create_test_app();
    let user = seed_user(&app.state, "dup@example.com").await;
    let token = create_test_jwt(&user.id);
    let station = seed_station(&app.state, test_station("Ten", "Rehovot", &[])).await;

    let body = json!({ "stationId": station.id, "fuelType": "gasoline95", "targetPrice": 6.5 });
    let (status, _) = send(
        &app.router,
        json_request("POST", "/api/users/alerts", Some(&token), Some(body.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, err) = send(
        &app.router,
        json_request("POST", "/api/users/alerts", Some(&token), Some(body)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "bad_request");

    // A different fuel at the same station is fine.
    let (status, _) = send(
        &app.router,
        json_request(
            "POST",
            "/api/users/alerts",
            Some(&token),
            Some(json!({ "stationId": station.id, "fuelType": "diesel", "targetPrice": 6.0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_alert_validation() {
    let app = create_test_app();
    let user = seed_user(&app.state, "invalid@example.com").await;
    let token = create_test_jwt(&user.id);

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/users/alerts",
            Some(&token),
            Some(json!({ "stationId": "", "fuelType": "jet-a", "targetPrice": 0.0 })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields = body["fields"].as_object().unwrap();
    for field in ["stationId", "fuelType", "targetPrice"] {
        assert!(fields.contains_key(field), "missing {field}: {fields:?}");
    }
}

#[tokio::test]
async fn test_update_and_delete_missing_alert() {
    let app = create_test_app();
    let user = seed_user(&app.state, "missing@example.com").await;
    let token = create_test_jwt(&user.id);

    let (status, _) = send(
        &app.router,
        json_request(
            "PUT",
            "/api/users/alerts/nope",
            Some(&token),
            Some(json!({ "targetPrice": 6.0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        json_request("DELETE", "/api/users/alerts/nope", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_update_allow_list() {
    let app = create_test_app();
    let user = seed_user(&app.state, "profile@example.com").await;
    let token = create_test_jwt(&user.id);

    let (status, body) = send(
        &app.router,
        json_request(
            "PUT",
            "/api/users/profile",
            Some(&token),
            Some(json!({
                "firstName": "Yael",
                "preferences": {
                    "defaultCity": "Haifa",
                    "preferredFuelType": "diesel",
                    "notifications": { "email": false, "push": false }
                },
                "email": "hijack@example.com",
                "favorites": ["injected"]
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firstName"], "Yael");
    assert_eq!(body["lastName"], "User");
    assert_eq!(body["email"], "profile@example.com");
    assert_eq!(body["favorites"], json!([]));
    assert_eq!(body["preferences"]["notifications"]["email"], false);
    assert_eq!(body["preferences"]["defaultCity"], "Haifa");
}
