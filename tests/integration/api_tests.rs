//! API integration tests against a running server

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:4000";

/// Plain admin password matching the server's configured hash
fn admin_password() -> String {
    std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string())
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_readiness_reports_database() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["database"], true);
    assert!(body["feed_connected"].is_boolean());
}

#[tokio::test]
#[ignore]
async fn test_dashboard_shape() {
    let client = Client::new();

    let response = client
        .get(format!("{}/api/dashboard", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let current = body["currentVisitors"].as_i64().expect("currentVisitors");
    let max = body["maxCapacity"].as_i64().expect("maxCapacity");
    let available = body["availableSeats"].as_i64().expect("availableSeats");
    let rate = body["occupancyRate"].as_i64().expect("occupancyRate");

    assert!(current >= 0);
    assert!(max >= 1);
    assert_eq!(available, (max - current).max(0));
    assert!((0..=100).contains(&rate));
    assert!(["open", "full", "closed"].contains(&body["status"].as_str().unwrap()));
    assert!(body["isOpen"].is_boolean());
}

#[tokio::test]
#[ignore]
async fn test_hourly_stats_cover_whole_day() {
    let client = Client::new();

    let response = client
        .get(format!("{}/api/stats/hourly?date=2024-01-15", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let hours = body.as_array().expect("Expected an array");
    assert_eq!(hours.len(), 24);
    for (i, hour) in hours.iter().enumerate() {
        assert_eq!(hour["hour"], i as i64);
        assert!(hour["entryCount"].is_number());
        assert!(hour["exitCount"].is_number());
        assert!(hour["peakVisitors"].is_number());
    }
}

#[tokio::test]
#[ignore]
async fn test_hourly_stats_rejects_bad_date() {
    let client = Client::new();

    let response = client
        .get(format!("{}/api/stats/hourly?date=15-01-2024", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_recent_events_limit() {
    let client = Client::new();

    let response = client
        .get(format!("{}/api/events/recent?limit=5", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let events = body.as_array().expect("Expected an array");
    assert!(events.len() <= 5);
    for event in events {
        assert!(["entry", "exit"].contains(&event["type"].as_str().unwrap()));
        assert!(event["timestamp"].is_string());
    }
}

#[tokio::test]
#[ignore]
async fn test_capacity_wrong_password_is_rejected() {
    let client = Client::new();

    let before: Value = client
        .get(format!("{}/api/dashboard", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    let response = client
        .post(format!("{}/api/capacity", BASE_URL))
        .json(&json!({
            "capacity": 42,
            "password": "definitely-not-the-password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);

    let after: Value = client
        .get(format!("{}/api/dashboard", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(before["maxCapacity"], after["maxCapacity"]);
}

#[tokio::test]
#[ignore]
async fn test_capacity_must_be_positive() {
    let client = Client::new();

    let response = client
        .post(format!("{}/api/capacity", BASE_URL))
        .json(&json!({
            "capacity": 0,
            "password": admin_password()
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_toggle_requires_boolean() {
    let client = Client::new();

    let response = client
        .post(format!("{}/api/status/toggle", BASE_URL))
        .json(&json!({ "isOpen": "yes" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}
