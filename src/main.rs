//! Resto Occupancy Server
//!
//! Startup order matters: the visitor count is reconciled from the event
//! log before any sensor or admin traffic is accepted.

use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resto_occupancy::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::{self, Repository},
    services::{
        feed::{self, FeedPublisher, FeedStatus},
        ingestor, Services,
    },
    AppState,
};

/// Capacity of the MQTT client request queue
const MQTT_REQUEST_CAPACITY: usize = 32;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.logging);

    tracing::info!("Starting Resto Occupancy Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = repository::connect(&config.database).await?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database migrations completed");

    // The MQTT client only connects once its event loop is polled
    let (mqtt_client, mqtt_eventloop) =
        rumqttc::AsyncClient::new(feed::mqtt_options(&config.mqtt), MQTT_REQUEST_CAPACITY);
    let feed_status = Arc::new(FeedStatus::new(Utc::now()));
    let publisher = FeedPublisher::new(
        mqtt_client.clone(),
        config.mqtt.topic_capacity.clone(),
        Arc::clone(&feed_status),
    );

    let repository = Repository::new(pool.clone());
    let services = Services::new(repository, &config, publisher)?;

    // Must complete before the ingestor and listener start
    let reconciliation = services.reconciler.run(Utc::now()).await?;
    tracing::info!(
        "Recovered {} current visitor(s) from today's log",
        reconciliation.recovered
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ingestor_task = tokio::spawn(services.ingestor(&config).run(
        mqtt_client,
        mqtt_eventloop,
        Duration::from_secs(config.mqtt.reconnect_max_secs),
        shutdown_rx.clone(),
    ));
    let monitor_task = ingestor::spawn_health_monitor(
        feed_status,
        Duration::from_secs(config.mqtt.health_check_interval_secs),
        Duration::from_secs(config.mqtt.stale_after_secs),
        shutdown_rx.clone(),
    );

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    let hub = state.services.gateway.hub().clone();
    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Dashboard API: http://{}/api/dashboard", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutting down gracefully...");
            // Stop the ingestor and end live subscriptions so in-flight requests can drain
            let _ = shutdown_tx.send(true);
            hub.close();
        })
        .await?;

    if let Err(e) = ingestor_task.await {
        tracing::error!("Ingestor task failed: {}", e);
    }
    monitor_task.abort();

    pool.close().await;
    tracing::info!("Server closed");

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("resto_occupancy={},tower_http=debug", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
