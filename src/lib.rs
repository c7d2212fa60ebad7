//! Restaurant occupancy server
//!
//! Tallies visitor entries and exits reported by a door sensor over MQTT,
//! keeps the live count in PostgreSQL and serves it to dashboards over a
//! JSON API and a WebSocket push channel.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod time;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
