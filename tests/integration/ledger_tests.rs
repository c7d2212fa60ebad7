//! Ledger and reconciliation tests against a real PostgreSQL database
//!
//! Point `DATABASE_URL` at a disposable database; every test truncates the
//! occupancy tables.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use resto_occupancy::{
    config::AppConfig,
    error::AppError,
    models::{OccupancyStatus, VisitorEventType},
    repository::{self, Repository},
    services::{
        admin::hash_password,
        feed::{FeedPublisher, FeedStatus},
        Services,
    },
    time,
};
use sqlx::PgPool;

const ADMIN_PASSWORD: &str = "integration secret";

/// Tests share one database
static DB_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    DB_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn setup() -> (AppConfig, Services, PgPool) {
    setup_with(AppConfig::default()).await
}

async fn setup_with(mut config: AppConfig) -> (AppConfig, Services, PgPool) {
    config.database.url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    config.database.max_connections = 20;
    config.admin.password_hash = Some(hash_password(ADMIN_PASSWORD).expect("Failed to hash"));

    let options = repository::connect_options(&config.database).expect("Invalid DATABASE_URL");
    let pool = repository::pool_options(&config.database)
        .connect_with(options)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    sqlx::query("TRUNCATE visitor_events, hourly_aggregates, current_status")
        .execute(&pool)
        .await
        .expect("Failed to truncate");

    let status = Arc::new(FeedStatus::new(Utc::now()));
    let publisher = FeedPublisher::detached(config.mqtt.topic_capacity.clone(), status);
    let services = Services::new(Repository::new(pool.clone()), &config, publisher)
        .expect("Failed to create services");

    (config, services, pool)
}

async fn insert_event(pool: &PgPool, event_type: VisitorEventType, at: DateTime<Utc>) {
    sqlx::query("INSERT INTO visitor_events (event_type, occurred_at) VALUES ($1, $2)")
        .bind(event_type.as_str())
        .bind(at)
        .execute(pool)
        .await
        .expect("Failed to insert event");
}

#[tokio::test]
#[ignore]
async fn test_status_missing_is_not_initialized() {
    let _guard = lock();
    let (_, services, _) = setup().await;

    let result = services.ledger.current_status().await;
    assert!(matches!(result, Err(AppError::NotInitialized)));

    let result = services.ledger.adjust_current_visitors(1).await;
    assert!(matches!(result, Err(AppError::NotInitialized)));
}

#[tokio::test]
#[ignore]
async fn test_bootstrap_creates_open_status_with_default_capacity() {
    let _guard = lock();
    let (config, services, _) = setup().await;

    let report = services.reconciler.run(Utc::now()).await.unwrap();
    assert!(report.created);
    assert_eq!(report.recovered, 0);

    let snapshot = services.ledger.current_status().await.unwrap();
    assert_eq!(snapshot.max_capacity, config.occupancy.default_max_capacity);
    assert!(snapshot.is_open);
    assert_eq!(snapshot.status, OccupancyStatus::Open);
}

#[tokio::test]
#[ignore]
async fn test_add_add_remove_scenario() {
    let _guard = lock();
    let (config, services, _) = setup().await;
    services.reconciler.run(Utc::now()).await.unwrap();

    let ingestor = services.ingestor(&config);
    let now = Utc::now();
    for event_type in [VisitorEventType::Entry, VisitorEventType::Entry, VisitorEventType::Exit] {
        ingestor.process(event_type, now).await.unwrap();
    }

    let snapshot = services.ledger.current_status().await.unwrap();
    assert_eq!(snapshot.current_visitors, 1);

    let tz = services.ledger.tz();
    let hourly = services
        .ledger
        .hourly_aggregates(time::local_date(now, tz))
        .await
        .unwrap();
    assert_eq!(hourly.len(), 24);
    let hour = &hourly[time::local_hour(now, tz) as usize];
    assert_eq!(hour.entry_count, 2);
    assert_eq!(hour.exit_count, 1);
    assert_eq!(hour.peak_visitors, 2);
}

#[tokio::test]
#[ignore]
async fn test_ingested_event_is_broadcast_in_order() {
    let _guard = lock();
    let (config, services, _) = setup().await;
    services.reconciler.run(Utc::now()).await.unwrap();
    let mut subscription = services.gateway.hub().subscribe();

    services
        .ingestor(&config)
        .handle_message(&config.mqtt.topic_sensor, b"add")
        .await;

    let batch = subscription.try_recv().expect("batch should be queued");
    let names: Vec<_> = batch.iter().map(|n| n.name()).collect();
    assert_eq!(names, ["visitor:event", "dashboard:update", "stats:hourly"]);
}

#[tokio::test]
#[ignore]
async fn test_restart_reconciles_from_log() {
    let _guard = lock();
    let (_, services, pool) = setup().await;
    let now = Utc::now();
    services.reconciler.run(now).await.unwrap();

    let today_start = time::start_of_today(now, services.ledger.tz());
    // Yesterday's traffic must not count
    insert_event(&pool, VisitorEventType::Entry, today_start - Duration::hours(1)).await;
    for _ in 0..5 {
        insert_event(&pool, VisitorEventType::Entry, now).await;
    }
    for _ in 0..2 {
        insert_event(&pool, VisitorEventType::Exit, now).await;
    }

    // Stale in-memory count left behind by a crash
    services
        .ledger
        .repository()
        .current_status
        .overwrite_visitors(7)
        .await
        .unwrap();

    let report = services.reconciler.run(now).await.unwrap();
    assert_eq!(report.previous, 7);
    assert_eq!(report.recovered, 3);
    assert_eq!(services.ledger.current_status().await.unwrap().current_visitors, 3);

    // Idempotent
    let again = services.reconciler.run(now).await.unwrap();
    assert_eq!(again.recovered, 3);
    assert!(!again.created);
}

#[tokio::test]
#[ignore]
async fn test_full_restaurant_snapshot() {
    let _guard = lock();
    let (_, services, _) = setup().await;
    services.reconciler.run(Utc::now()).await.unwrap();

    services.ledger.update_max_capacity(10).await.unwrap();
    services
        .ledger
        .repository()
        .current_status
        .overwrite_visitors(10)
        .await
        .unwrap();

    let snapshot = services.ledger.current_status().await.unwrap();
    assert_eq!(snapshot.status, OccupancyStatus::Full);
    assert_eq!(snapshot.available_seats, 0);
    assert_eq!(snapshot.occupancy_rate, 100);

    let closed = services.ledger.toggle_open(false).await.unwrap();
    assert_eq!(closed.status, OccupancyStatus::Closed);
}

#[tokio::test]
#[ignore]
async fn test_invalid_capacity_keeps_previous_value() {
    let _guard = lock();
    let (_, services, _) = setup().await;
    services.reconciler.run(Utc::now()).await.unwrap();
    services.ledger.update_max_capacity(25).await.unwrap();

    let result = services.ledger.update_max_capacity(0).await;
    assert!(matches!(result, Err(AppError::InvalidCapacity(0))));
    assert_eq!(services.ledger.current_status().await.unwrap().max_capacity, 25);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_increments_are_not_lost() {
    let _guard = lock();
    let (_, services, _) = setup().await;
    services.reconciler.run(Utc::now()).await.unwrap();

    let handles: Vec<_> = (0..40)
        .map(|_| {
            let ledger = services.ledger.clone();
            tokio::spawn(async move { ledger.adjust_current_visitors(1).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(services.ledger.current_status().await.unwrap().current_visitors, 40);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_hourly_upserts_are_not_lost() {
    let _guard = lock();
    let (_, services, _) = setup().await;
    let date = chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

    let handles: Vec<_> = (1..=30)
        .map(|current| {
            let ledger = services.ledger.clone();
            tokio::spawn(async move {
                ledger
                    .upsert_hourly_aggregate(date, 13, VisitorEventType::Entry, current)
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let hourly = services.ledger.hourly_aggregates(date).await.unwrap();
    assert_eq!(hourly[13].entry_count, 30);
    assert_eq!(hourly[13].peak_visitors, 30);
    assert_eq!(hourly.iter().filter(|h| h.entry_count > 0).count(), 1);
}

#[tokio::test]
#[ignore]
async fn test_recent_events_newest_first_and_bounded() {
    let _guard = lock();
    let (_, services, pool) = setup().await;
    let now = Utc::now();
    for i in 0..5 {
        insert_event(&pool, VisitorEventType::Entry, now - Duration::minutes(10 - i)).await;
    }
    insert_event(&pool, VisitorEventType::Exit, now).await;

    let events = services.ledger.recent_events(Some(3)).await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].event_type, VisitorEventType::Exit);

    let all = services.ledger.recent_events(None).await.unwrap();
    assert_eq!(all.len(), 6);
}

fn event_names(batch: &[resto_occupancy::models::notification::Notification]) -> Vec<&'static str> {
    batch.iter().map(|n| n.name()).collect()
}

#[tokio::test]
#[ignore]
async fn test_capacity_change_persists_and_broadcasts() {
    let _guard = lock();
    let (_, services, _) = setup().await;
    services.reconciler.run(Utc::now()).await.unwrap();
    let mut subscription = services.gateway.hub().subscribe();

    let capacity = services
        .gateway
        .change_capacity(64, Some(ADMIN_PASSWORD))
        .await
        .unwrap();
    assert_eq!(capacity, 64);
    assert_eq!(services.ledger.current_status().await.unwrap().max_capacity, 64);

    let batch = subscription.try_recv().expect("batch should be queued");
    assert_eq!(event_names(&batch), ["dashboard:update", "capacity:updated"]);

    let rejected = services.gateway.change_capacity(8, Some("wrong")).await;
    assert!(matches!(rejected, Err(AppError::Unauthorized(_))));
    assert_eq!(services.ledger.current_status().await.unwrap().max_capacity, 64);
    assert!(subscription.try_recv().is_none());
}

#[tokio::test]
#[ignore]
async fn test_closing_persists_and_broadcasts() {
    let _guard = lock();
    let (_, services, _) = setup().await;
    services.reconciler.run(Utc::now()).await.unwrap();
    let mut subscription = services.gateway.hub().subscribe();

    let snapshot = services.gateway.set_open(false, None).await.unwrap();
    assert_eq!(snapshot.status, OccupancyStatus::Closed);
    assert!(!services.ledger.current_status().await.unwrap().is_open);

    let batch = subscription.try_recv().expect("batch should be queued");
    assert_eq!(event_names(&batch), ["dashboard:update", "status:updated"]);
}

#[tokio::test]
#[ignore]
async fn test_welcome_batch_is_snapshot_then_hourly() {
    let _guard = lock();
    let (_, services, _) = setup().await;
    services.reconciler.run(Utc::now()).await.unwrap();

    let batch = services.gateway.welcome_batch().await.unwrap();
    assert_eq!(event_names(&batch), ["dashboard:update", "stats:hourly"]);
}

#[tokio::test]
#[ignore]
async fn test_locked_status_row_times_out_as_unavailable() {
    let _guard = lock();
    let mut config = AppConfig::default();
    config.database.statement_timeout_secs = 1;
    let (_, services, pool) = setup_with(config).await;
    services.reconciler.run(Utc::now()).await.unwrap();

    let mut holder = pool.begin().await.unwrap();
    sqlx::query("SELECT * FROM current_status FOR UPDATE")
        .execute(&mut *holder)
        .await
        .unwrap();

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        services.ledger.adjust_current_visitors(1),
    )
    .await
    .expect("lock wait should be bounded");
    assert!(matches!(result, Err(AppError::StorageUnavailable(_))));

    holder.rollback().await.unwrap();
    assert_eq!(services.ledger.current_status().await.unwrap().current_visitors, 0);
}
