//! Administrative endpoints (capacity, open/close)

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::AppResult, models::current_status::DashboardSnapshot, AppState};

use super::ValidJson;

/// Capacity change request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCapacityRequest {
    /// New maximum capacity (at least 1)
    pub capacity: i32,
    /// Admin password
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateCapacityResponse {
    pub success: bool,
    pub capacity: i32,
}

/// Open/close request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleStatusRequest {
    pub is_open: bool,
    /// Admin password, required only when toggling is protected
    pub password: Option<String>,
}

/// Change the maximum capacity
#[utoipa::path(
    post,
    path = "/api/capacity",
    tag = "admin",
    request_body = UpdateCapacityRequest,
    responses(
        (status = 200, description = "Capacity updated", body = UpdateCapacityResponse),
        (status = 400, description = "Invalid capacity", body = crate::error::ErrorResponse),
        (status = 401, description = "Bad or missing admin password", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_capacity(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<UpdateCapacityRequest>,
) -> AppResult<Json<UpdateCapacityResponse>> {
    let capacity = state
        .services
        .gateway
        .change_capacity(request.capacity, request.password.as_deref())
        .await?;

    Ok(Json(UpdateCapacityResponse {
        success: true,
        capacity,
    }))
}

/// Open or close the restaurant
#[utoipa::path(
    post,
    path = "/api/status/toggle",
    tag = "admin",
    request_body = ToggleStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = DashboardSnapshot),
        (status = 400, description = "Invalid status value", body = crate::error::ErrorResponse)
    )
)]
pub async fn toggle_status(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<ToggleStatusRequest>,
) -> AppResult<Json<DashboardSnapshot>> {
    let snapshot = state
        .services
        .gateway
        .set_open(request.is_open, request.password.as_deref())
        .await?;
    Ok(Json(snapshot))
}
