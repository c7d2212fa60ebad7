//! Current status model (singleton occupancy record) and the derived dashboard snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Fixed key of the singleton status row
pub const STATUS_ID: &str = "singleton";

/// Lower bound applied to the visitor count while the restaurant is open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloorPolicy {
    /// Count never drops below 0
    #[default]
    None,
    /// While open, a decrement that would reach 0 leaves 1 instead
    OneWhileOpen,
}

/// Singleton `current_status` row
#[derive(Debug, Clone, FromRow)]
pub struct CurrentStatus {
    pub id: String,
    pub current_visitors: i32,
    pub max_capacity: i32,
    pub is_open: bool,
    pub updated_at: DateTime<Utc>,
}

impl CurrentStatus {
    /// Visitor count after applying `delta` under `policy`
    pub fn visitors_after(&self, delta: i32, policy: FloorPolicy) -> i32 {
        let next = self.current_visitors.saturating_add(delta).max(0);
        match policy {
            FloorPolicy::OneWhileOpen if self.is_open && delta < 0 && next == 0 => 1,
            _ => next,
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot::derive(self.current_visitors, self.max_capacity, self.is_open)
    }
}

/// Visitor count recovered from today's event log
pub fn recovered_visitors(entries: i64, exits: i64, is_open: bool, policy: FloorPolicy) -> i32 {
    let net = (entries - exits).clamp(0, i32::MAX as i64) as i32;
    match policy {
        FloorPolicy::OneWhileOpen if is_open && net == 0 => 1,
        _ => net,
    }
}

/// Tri-state occupancy status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OccupancyStatus {
    Open,
    Full,
    Closed,
}

/// Point-in-time dashboard view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub current_visitors: i32,
    pub max_capacity: i32,
    pub available_seats: i32,
    /// Percentage of capacity in use, 0-100
    pub occupancy_rate: i32,
    pub status: OccupancyStatus,
    pub is_open: bool,
}

impl DashboardSnapshot {
    pub fn derive(current_visitors: i32, max_capacity: i32, is_open: bool) -> Self {
        let available_seats = max_capacity.saturating_sub(current_visitors).max(0);
        let occupancy_rate = if max_capacity > 0 {
            let rate = (100.0 * current_visitors as f64 / max_capacity as f64).round();
            rate.clamp(0.0, 100.0) as i32
        } else {
            0
        };
        let status = if !is_open {
            OccupancyStatus::Closed
        } else if current_visitors >= max_capacity {
            OccupancyStatus::Full
        } else {
            OccupancyStatus::Open
        };

        Self {
            current_visitors,
            max_capacity,
            available_seats,
            occupancy_rate,
            status,
            is_open,
        }
    }
}
