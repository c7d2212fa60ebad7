//! Live-push notifications

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    current_status::DashboardSnapshot, hourly_aggregate::HourlyStats,
    visitor_event::VisitorEventType,
};
use crate::time;

/// Transient notification for one processed sensor event (never persisted)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: VisitorEventType,
    /// ISO 8601 timestamp in the reference timezone
    pub timestamp: String,
    pub current_visitors: i32,
}

impl RealtimeEvent {
    pub fn new(event_type: VisitorEventType, at: DateTime<Utc>, tz: Tz, current_visitors: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            timestamp: time::to_iso_string(at, tz),
            current_visitors,
        }
    }
}

/// Named notification, serialized as `{"event": <name>, "data": <payload>}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum Notification {
    #[serde(rename = "dashboard:update")]
    DashboardUpdate(DashboardSnapshot),
    #[serde(rename = "stats:hourly")]
    HourlyStats(Vec<HourlyStats>),
    #[serde(rename = "visitor:event")]
    VisitorEvent(RealtimeEvent),
    #[serde(rename = "capacity:updated")]
    CapacityUpdated { capacity: i32 },
    #[serde(rename = "status:updated")]
    StatusUpdated {
        #[serde(rename = "isOpen")]
        is_open: bool,
    },
}

impl Notification {
    pub fn name(&self) -> &'static str {
        match self {
            Notification::DashboardUpdate(_) => "dashboard:update",
            Notification::HourlyStats(_) => "stats:hourly",
            Notification::VisitorEvent(_) => "visitor:event",
            Notification::CapacityUpdated { .. } => "capacity:updated",
            Notification::StatusUpdated { .. } => "status:updated",
        }
    }
}
