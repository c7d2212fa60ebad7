//! Startup reconciliation of the live visitor count
//!
//! The stored count only ever moves by small deltas, so a crash or a missed
//! event leaves it drifting. At startup it is recomputed from today's
//! committed event log and overwritten unconditionally.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::{
    error::AppResult,
    models::{current_status::{recovered_visitors, FloorPolicy}, visitor_event::EventTally},
    repository::Repository,
    time,
};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// Whether the status row had to be created
    pub created: bool,
    pub previous: i32,
    pub recovered: i32,
    pub tally: EventTally,
}

#[derive(Clone)]
pub struct Reconciler {
    repository: Repository,
    tz: Tz,
    floor_policy: FloorPolicy,
    default_capacity: i32,
}

impl Reconciler {
    pub fn new(repository: Repository, tz: Tz, floor_policy: FloorPolicy, default_capacity: i32) -> Self {
        Self {
            repository,
            tz,
            floor_policy,
            default_capacity,
        }
    }

    /// Ensure the status row exists, then rebuild its visitor count from the
    /// events logged since local midnight of `now`
    pub async fn run(&self, now: DateTime<Utc>) -> AppResult<Reconciliation> {
        let created = self.repository.current_status.ensure(self.default_capacity).await?;
        if created {
            tracing::info!(
                "Initialized occupancy status with capacity {}",
                self.default_capacity
            );
        }

        let status = self.repository.current_status.get().await?;
        let since = time::start_of_today(now, self.tz);
        let tally = self.repository.visitor_events.tally_between(since, now).await?;
        let recovered = recovered_visitors(tally.entries, tally.exits, status.is_open, self.floor_policy);

        self.repository.current_status.overwrite_visitors(recovered).await?;

        tracing::info!(
            entries = tally.entries,
            exits = tally.exits,
            "Synced visitor count: {} (was {})",
            recovered,
            status.current_visitors
        );

        Ok(Reconciliation {
            created,
            previous: status.current_visitors,
            recovered,
            tally,
        })
    }
}
