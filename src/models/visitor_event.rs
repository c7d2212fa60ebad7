//! Visitor event model (append-only entry/exit log)

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::{error::AppError, time};

/// Direction of a sensor-reported crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VisitorEventType {
    Entry,
    Exit,
}

impl VisitorEventType {
    /// Decode a raw sensor payload (`add` / `remove`, any case)
    pub fn from_sensor_payload(payload: &[u8]) -> Option<Self> {
        let message = std::str::from_utf8(payload).ok()?.trim().to_lowercase();
        match message.as_str() {
            "add" => Some(VisitorEventType::Entry),
            "remove" => Some(VisitorEventType::Exit),
            _ => None,
        }
    }

    /// Change applied to the live visitor count
    pub fn delta(self) -> i32 {
        match self {
            VisitorEventType::Entry => 1,
            VisitorEventType::Exit => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VisitorEventType::Entry => "entry",
            VisitorEventType::Exit => "exit",
        }
    }
}

impl std::str::FromStr for VisitorEventType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(VisitorEventType::Entry),
            "exit" => Ok(VisitorEventType::Exit),
            other => Err(AppError::InvalidInput(format!("Unknown visitor event type: {}", other))),
        }
    }
}

impl std::fmt::Display for VisitorEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw `visitor_events` row
#[derive(Debug, Clone, FromRow)]
pub struct VisitorEventRow {
    pub id: i64,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
}

/// Immutable visitor event
#[derive(Debug, Clone, PartialEq)]
pub struct VisitorEvent {
    pub id: i64,
    pub event_type: VisitorEventType,
    pub occurred_at: DateTime<Utc>,
}

impl TryFrom<VisitorEventRow> for VisitorEvent {
    type Error = AppError;

    fn try_from(row: VisitorEventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            event_type: row.event_type.parse()?,
            occurred_at: row.occurred_at,
        })
    }
}

/// Visitor event as returned by the recent-events endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecentEvent {
    pub id: i64,
    #[serde(rename = "type")]
    pub event_type: VisitorEventType,
    /// ISO 8601 timestamp in the reference timezone
    pub timestamp: String,
}

impl RecentEvent {
    pub fn from_event(event: &VisitorEvent, tz: Tz) -> Self {
        Self {
            id: event.id,
            event_type: event.event_type,
            timestamp: time::to_iso_string(event.occurred_at, tz),
        }
    }
}

/// Query parameters for recent events
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RecentEventsQuery {
    /// Maximum number of events (default 20, max 500); missing, unparsable
    /// or non-positive values fall back to the default
    #[param(value_type = Option<i64>)]
    pub limit: Option<String>,
}

impl RecentEventsQuery {
    /// Leading integer of `limit`, ignoring trailing garbage (`"15abc"` is 15)
    pub fn limit(&self) -> Option<i64> {
        let raw = self.limit.as_deref()?.trim_start();
        let digits_start = usize::from(raw.starts_with(['+', '-']));
        let digits_end = raw[digits_start..]
            .find(|c: char| !c.is_ascii_digit())
            .map_or(raw.len(), |i| i + digits_start);
        raw[..digits_end].parse().ok()
    }
}

/// Entry/exit totals over a time window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct EventTally {
    pub entries: i64,
    pub exits: i64,
}
