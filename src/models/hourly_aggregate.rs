//! Hourly aggregate model (per-hour rollup of the event log)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::visitor_event::VisitorEventType;

pub const HOURS_PER_DAY: i32 = 24;

/// `hourly_aggregates` row, unique on (date, hour)
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct HourlyAggregate {
    pub date: NaiveDate,
    pub hour: i32,
    pub entry_count: i32,
    pub exit_count: i32,
    pub peak_visitors: i32,
}

impl HourlyAggregate {
    /// New row seeded from the first event of the hour
    pub fn seeded(
        date: NaiveDate,
        hour: i32,
        event_type: VisitorEventType,
        current_visitors: i32,
    ) -> Self {
        Self {
            date,
            hour,
            entry_count: (event_type == VisitorEventType::Entry) as i32,
            exit_count: (event_type == VisitorEventType::Exit) as i32,
            peak_visitors: current_visitors.max(0),
        }
    }

    /// Fold one more event into an existing row
    pub fn record(&mut self, event_type: VisitorEventType, current_visitors: i32) {
        match event_type {
            VisitorEventType::Entry => {
                self.entry_count += 1;
                self.peak_visitors = self.peak_visitors.max(current_visitors);
            }
            VisitorEventType::Exit => {
                self.exit_count += 1;
            }
        }
    }
}

/// Per-hour statistics as served to the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HourlyStats {
    pub hour: i32,
    pub entry_count: i32,
    pub exit_count: i32,
    pub peak_visitors: i32,
}

impl From<&HourlyAggregate> for HourlyStats {
    fn from(row: &HourlyAggregate) -> Self {
        Self {
            hour: row.hour,
            entry_count: row.entry_count,
            exit_count: row.exit_count,
            peak_visitors: row.peak_visitors,
        }
    }
}

/// Expand sparse rows into exactly 24 hours, ascending, zero-filled
pub fn fill_day(rows: &[HourlyAggregate]) -> Vec<HourlyStats> {
    (0..HOURS_PER_DAY)
        .map(|hour| {
            rows.iter()
                .find(|row| row.hour == hour)
                .map(HourlyStats::from)
                .unwrap_or(HourlyStats {
                    hour,
                    ..HourlyStats::default()
                })
        })
        .collect()
}

/// Query parameters for hourly statistics
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct HourlyStatsQuery {
    /// Calendar date in the reference timezone (YYYY-MM-DD), defaults to today
    pub date: Option<String>,
}
