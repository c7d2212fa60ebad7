//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, dashboard, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Resto Occupancy API",
        version = "1.0.0",
        description = "Live restaurant occupancy from a door sensor. Live updates are pushed over the /ws WebSocket as {\"event\", \"data\"} frames: dashboard:update, stats:hourly, visitor:event, capacity:updated, status:updated."
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Dashboard
        dashboard::get_dashboard,
        dashboard::get_hourly_stats,
        dashboard::get_recent_events,
        // Admin
        admin::update_capacity,
        admin::toggle_status,
    ),
    components(
        schemas(
            crate::models::current_status::DashboardSnapshot,
            crate::models::current_status::OccupancyStatus,
            crate::models::hourly_aggregate::HourlyStats,
            crate::models::visitor_event::RecentEvent,
            crate::models::visitor_event::VisitorEventType,
            crate::models::notification::RealtimeEvent,
            admin::UpdateCapacityRequest,
            admin::UpdateCapacityResponse,
            admin::ToggleStatusRequest,
            health::HealthResponse,
            health::ReadinessResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "dashboard", description = "Occupancy queries"),
        (name = "admin", description = "Capacity and opening status")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
