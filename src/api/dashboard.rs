//! Dashboard query endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{
        current_status::DashboardSnapshot,
        hourly_aggregate::{HourlyStats, HourlyStatsQuery},
        visitor_event::{RecentEvent, RecentEventsQuery},
    },
    AppState,
};

use super::ValidQuery;

/// Current occupancy snapshot
#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "dashboard",
    responses(
        (status = 200, description = "Current dashboard snapshot", body = DashboardSnapshot),
        (status = 503, description = "Status not initialized or storage unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardSnapshot>> {
    let snapshot = state.services.ledger.current_status().await?;
    Ok(Json(snapshot))
}

/// Hourly statistics for one day (24 entries, zero-filled)
#[utoipa::path(
    get,
    path = "/api/stats/hourly",
    tag = "dashboard",
    params(HourlyStatsQuery),
    responses(
        (status = 200, description = "Hourly statistics", body = Vec<HourlyStats>),
        (status = 400, description = "Invalid date", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_hourly_stats(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<HourlyStatsQuery>,
) -> AppResult<Json<Vec<HourlyStats>>> {
    let date = state.services.ledger.parse_date(query.date.as_deref())?;
    let stats = state.services.ledger.hourly_aggregates(date).await?;
    Ok(Json(stats))
}

/// Most recent visitor events, newest first
#[utoipa::path(
    get,
    path = "/api/events/recent",
    tag = "dashboard",
    params(RecentEventsQuery),
    responses(
        (status = 200, description = "Recent visitor events", body = Vec<RecentEvent>),
        (status = 400, description = "Malformed query string", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_recent_events(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<RecentEventsQuery>,
) -> AppResult<Json<Vec<RecentEvent>>> {
    let events = state.services.ledger.recent_events(query.limit()).await?;
    Ok(Json(events))
}
