//! Repository layer for database operations

pub mod current_status;
pub mod hourly_aggregates;
pub mod visitor_events;

use std::{str::FromStr, time::Duration};

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Pool, Postgres,
};

use crate::{config::DatabaseConfig, error::AppResult};

/// Connection options with server-side time bounds: a statement running
/// longer than `statement_timeout_secs`, or waiting that long for a row
/// lock, is cancelled by PostgreSQL.
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, sqlx::Error> {
    let timeout_ms = (config.statement_timeout_secs * 1000).to_string();
    Ok(PgConnectOptions::from_str(&config.url)?.options([
        ("statement_timeout", timeout_ms.as_str()),
        ("lock_timeout", timeout_ms.as_str()),
    ]))
}

pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
}

/// Open the pool; every Ledger call is bounded by the acquire timeout and
/// the per-connection statement and lock timeouts
pub async fn connect(config: &DatabaseConfig) -> AppResult<Pool<Postgres>> {
    let pool = pool_options(config)
        .connect_with(connect_options(config)?)
        .await?;
    Ok(pool)
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub current_status: current_status::CurrentStatusRepository,
    pub visitor_events: visitor_events::VisitorEventsRepository,
    pub hourly_aggregates: hourly_aggregates::HourlyAggregatesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            current_status: current_status::CurrentStatusRepository::new(pool.clone()),
            visitor_events: visitor_events::VisitorEventsRepository::new(pool.clone()),
            hourly_aggregates: hourly_aggregates::HourlyAggregatesRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
