//! Business logic services

pub mod admin;
pub mod broadcast;
pub mod feed;
pub mod gateway;
pub mod ingestor;
pub mod ledger;
pub mod reconciler;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub ledger: ledger::OccupancyLedger,
    pub reconciler: reconciler::Reconciler,
    pub gateway: gateway::Gateway,
}

impl Services {
    /// Create all services with the given repository and feed publisher
    pub fn new(repository: Repository, config: &AppConfig, feed: feed::FeedPublisher) -> AppResult<Self> {
        let tz = config
            .occupancy
            .tz()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let policy = config.occupancy.floor_policy;

        let ledger = ledger::OccupancyLedger::new(
            repository.clone(),
            tz,
            policy,
            config.occupancy.recent_events_limit,
        );
        let reconciler = reconciler::Reconciler::new(
            repository,
            tz,
            policy,
            config.occupancy.default_max_capacity,
        );
        let gateway = gateway::Gateway::new(
            ledger.clone(),
            broadcast::BroadcastHub::new(config.server.subscriber_buffer),
            admin::AdminService::new(&config.admin),
            feed,
        );

        Ok(Self {
            ledger,
            reconciler,
            gateway,
        })
    }

    /// Ingestor wired to this ledger and gateway
    pub fn ingestor(&self, config: &AppConfig) -> ingestor::SensorIngestor {
        ingestor::SensorIngestor::new(&config.mqtt, self.ledger.clone(), self.gateway.clone())
    }
}
