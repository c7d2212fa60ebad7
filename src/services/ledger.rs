//! Occupancy ledger service
//!
//! Single mutation path for the status row and hourly aggregates. Calendar
//! math always uses the configured reference timezone.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::{
    error::{AppError, AppResult},
    models::{
        current_status::{DashboardSnapshot, FloorPolicy},
        hourly_aggregate::{self, HourlyStats, HOURS_PER_DAY},
        visitor_event::{RecentEvent, VisitorEvent, VisitorEventType},
    },
    repository::Repository,
    time,
};

/// Upper bound on a single recent-events page
pub const MAX_RECENT_EVENTS: i64 = 500;

#[derive(Clone)]
pub struct OccupancyLedger {
    repository: Repository,
    tz: Tz,
    floor_policy: FloorPolicy,
    default_recent_limit: i64,
}

impl OccupancyLedger {
    pub fn new(repository: Repository, tz: Tz, floor_policy: FloorPolicy, default_recent_limit: i64) -> Self {
        Self {
            repository,
            tz,
            floor_policy,
            default_recent_limit,
        }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Append a visitor event to the log
    pub async fn append_event(
        &self,
        event_type: VisitorEventType,
        at: DateTime<Utc>,
    ) -> AppResult<VisitorEvent> {
        self.repository.visitor_events.append(event_type, at).await
    }

    /// Apply a +1/-1 delta and return the new visitor count
    pub async fn adjust_current_visitors(&self, delta: i32) -> AppResult<i32> {
        let status = self
            .repository
            .current_status
            .adjust_visitors(delta, self.floor_policy)
            .await?;
        Ok(status.current_visitors)
    }

    /// Derived dashboard view of the status row
    pub async fn current_status(&self) -> AppResult<DashboardSnapshot> {
        Ok(self.repository.current_status.get().await?.snapshot())
    }

    /// Change the maximum capacity; the stored value is kept on rejection
    pub async fn update_max_capacity(&self, capacity: i32) -> AppResult<DashboardSnapshot> {
        if capacity < 1 {
            return Err(AppError::InvalidCapacity(capacity));
        }
        let status = self.repository.current_status.set_max_capacity(capacity).await?;
        tracing::info!("Max capacity set to {}", capacity);
        Ok(status.snapshot())
    }

    pub async fn toggle_open(&self, is_open: bool) -> AppResult<DashboardSnapshot> {
        let status = self.repository.current_status.set_open(is_open).await?;
        tracing::info!("Restaurant marked {}", if is_open { "open" } else { "closed" });
        Ok(status.snapshot())
    }

    /// Fold one event into the hourly rollup for (date, hour)
    pub async fn upsert_hourly_aggregate(
        &self,
        date: NaiveDate,
        hour: u32,
        event_type: VisitorEventType,
        current_visitors: i32,
    ) -> AppResult<()> {
        let hour = i32::try_from(hour)
            .ok()
            .filter(|h| (0..HOURS_PER_DAY).contains(h))
            .ok_or_else(|| AppError::InvalidInput(format!("Hour out of range: {}", hour)))?;

        self.repository
            .hourly_aggregates
            .record(date, hour, event_type, current_visitors)
            .await?;
        Ok(())
    }

    /// All 24 hours of `date`, zero-filled
    pub async fn hourly_aggregates(&self, date: NaiveDate) -> AppResult<Vec<HourlyStats>> {
        let rows = self.repository.hourly_aggregates.list_for_date(date).await?;
        Ok(hourly_aggregate::fill_day(&rows))
    }

    pub async fn today_hourly_aggregates(&self) -> AppResult<Vec<HourlyStats>> {
        self.hourly_aggregates(self.today()).await
    }

    /// Page size for a requested limit: non-positive or missing means the
    /// default, and the result never exceeds `MAX_RECENT_EVENTS`
    pub fn recent_limit(&self, requested: Option<i64>) -> i64 {
        requested
            .filter(|n| *n > 0)
            .unwrap_or(self.default_recent_limit)
            .clamp(1, MAX_RECENT_EVENTS)
    }

    /// Newest events first
    pub async fn recent_events(&self, limit: Option<i64>) -> AppResult<Vec<RecentEvent>> {
        let limit = self.recent_limit(limit);
        let events = self.repository.visitor_events.recent(limit).await?;
        Ok(events
            .iter()
            .map(|event| RecentEvent::from_event(event, self.tz))
            .collect())
    }

    /// Today's date in the reference timezone
    pub fn today(&self) -> NaiveDate {
        time::local_date(Utc::now(), self.tz)
    }

    /// Parse a `YYYY-MM-DD` query value, defaulting to today
    pub fn parse_date(&self, value: Option<&str>) -> AppResult<NaiveDate> {
        match value {
            None => Ok(self.today()),
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| AppError::InvalidInput(format!("Invalid date: {}", s))),
        }
    }
}
