//! Broadcast gateway: every state change goes to the ledger first, then
//! out to live subscribers

use crate::{
    error::AppResult,
    models::{
        current_status::DashboardSnapshot,
        notification::{Notification, RealtimeEvent},
    },
};

use super::{
    admin::AdminService, broadcast::BroadcastHub, feed::FeedPublisher, ledger::OccupancyLedger,
};

#[derive(Clone)]
pub struct Gateway {
    ledger: OccupancyLedger,
    hub: BroadcastHub,
    admin: AdminService,
    feed: FeedPublisher,
}

impl Gateway {
    pub fn new(ledger: OccupancyLedger, hub: BroadcastHub, admin: AdminService, feed: FeedPublisher) -> Self {
        Self {
            ledger,
            hub,
            admin,
            feed,
        }
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn feed(&self) -> &FeedPublisher {
        &self.feed
    }

    /// Point-in-time state for a newly connected subscriber
    pub async fn welcome_batch(&self) -> AppResult<Vec<Notification>> {
        let dashboard = self.ledger.current_status().await?;
        let hourly = self.ledger.today_hourly_aggregates().await?;
        Ok(vec![
            Notification::DashboardUpdate(dashboard),
            Notification::HourlyStats(hourly),
        ])
    }

    /// Fan out a processed sensor event, followed by the refreshed snapshot
    /// and today's hourly stats
    pub async fn publish_visitor_event(&self, event: RealtimeEvent) {
        let mut batch = vec![Notification::VisitorEvent(event)];

        match self.ledger.current_status().await {
            Ok(dashboard) => batch.push(Notification::DashboardUpdate(dashboard)),
            Err(e) => tracing::error!("Failed to refresh dashboard for broadcast: {}", e),
        }
        match self.ledger.today_hourly_aggregates().await {
            Ok(hourly) => batch.push(Notification::HourlyStats(hourly)),
            Err(e) => tracing::error!("Failed to refresh hourly stats for broadcast: {}", e),
        }

        let delivered = self.hub.broadcast(batch);
        tracing::debug!("Visitor event pushed to {} subscriber(s)", delivered);
    }

    /// Authenticated capacity change; on success the new capacity is
    /// published to the sensor controller and pushed to subscribers
    pub async fn change_capacity(&self, capacity: i32, password: Option<&str>) -> AppResult<i32> {
        self.admin.verify(password)?;

        let dashboard = self.ledger.update_max_capacity(capacity).await?;
        self.feed.publish_capacity(capacity);
        self.hub.broadcast(vec![
            Notification::DashboardUpdate(dashboard),
            Notification::CapacityUpdated { capacity },
        ]);

        Ok(capacity)
    }

    /// Open or close the restaurant and push the result
    pub async fn set_open(&self, is_open: bool, password: Option<&str>) -> AppResult<DashboardSnapshot> {
        self.admin.verify_toggle(password)?;

        let dashboard = self.ledger.toggle_open(is_open).await?;
        self.hub.broadcast(vec![
            Notification::DashboardUpdate(dashboard.clone()),
            Notification::StatusUpdated { is_open },
        ]);

        Ok(dashboard)
    }
}
