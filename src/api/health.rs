//! Health check endpoints

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{time, AppState};

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Current status of the service
    pub status: String,
    /// Version of the service
    pub version: String,
    /// Server time in the reference timezone
    pub timestamp: String,
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: String,
    pub database: bool,
    pub feed_connected: bool,
    pub feed_stale: bool,
    /// Last sensor message, reference timezone
    pub last_message_at: String,
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: time::to_iso_string(Utc::now(), state.services.ledger.tz()),
    })
}

/// Readiness check (database round-trip and sensor feed liveness)
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Database unreachable", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let ledger = &state.services.ledger;
    let feed = state.services.gateway.feed().status();
    let stale_after = Duration::from_secs(state.config.mqtt.stale_after_secs);

    let database = match ledger.repository().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            false
        }
    };
    let feed_stale = feed.is_stale(Utc::now(), stale_after);

    let status = if database { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(ReadinessResponse {
            status: if database { "ready" } else { "unavailable" }.to_string(),
            database,
            feed_connected: feed.is_connected(),
            feed_stale,
            last_message_at: time::to_iso_string(feed.last_message_at(), ledger.tz()),
        }),
    )
}
