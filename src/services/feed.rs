//! MQTT sensor feed plumbing: connection options, liveness state,
//! reconnect backoff and the capacity publisher

use std::{
    sync::{
        atomic::{AtomicBool, AtomicI64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use rumqttc::{AsyncClient, MqttOptions, QoS};

use crate::{
    config::MqttConfig,
    error::{AppError, AppResult},
};

/// Connection options for the configured broker
pub fn mqtt_options(config: &MqttConfig) -> MqttOptions {
    let client_id = format!("resto-dashboard-{:06x}", rand::thread_rng().gen_range(0..0x100_0000u32));
    let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
    options
        .set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)))
        .set_clean_session(true);
    options
}

/// Connection and liveness state shared between the ingestor, the health
/// monitor and the readiness check
#[derive(Debug)]
pub struct FeedStatus {
    connected: AtomicBool,
    last_message_ms: AtomicI64,
}

impl FeedStatus {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            connected: AtomicBool::new(false),
            last_message_ms: AtomicI64::new(now.timestamp_millis()),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn record_message(&self, at: DateTime<Utc>) {
        self.last_message_ms.store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_message_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.last_message_ms.load(Ordering::Relaxed))
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// No message for longer than `threshold`
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        let elapsed_ms = now.timestamp_millis() - self.last_message_ms.load(Ordering::Relaxed);
        elapsed_ms > threshold.as_millis() as i64
    }
}

/// Jittered exponential backoff between reconnect attempts
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl ReconnectBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            max: max.max(base),
            attempt: 0,
        }
    }

    /// Delay before the next attempt; grows until `max`, with +/-20% jitter
    pub fn next_delay(&mut self) -> Duration {
        let exp = 2u32.saturating_pow(self.attempt.min(16));
        self.attempt = self.attempt.saturating_add(1);
        let delay = self.base.saturating_mul(exp).min(self.max);
        let jitter = rand::thread_rng().gen_range(0.8..=1.2);
        delay.mul_f64(jitter).min(self.max)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Publishes capacity changes back to the sensor controller
#[derive(Clone)]
pub struct FeedPublisher {
    client: Option<AsyncClient>,
    topic: String,
    status: Arc<FeedStatus>,
}

impl FeedPublisher {
    pub fn new(client: AsyncClient, topic: String, status: Arc<FeedStatus>) -> Self {
        Self {
            client: Some(client),
            topic,
            status,
        }
    }

    /// Publisher with no broker behind it (publishes are logged and skipped)
    pub fn detached(topic: String, status: Arc<FeedStatus>) -> Self {
        Self {
            client: None,
            topic,
            status,
        }
    }

    pub fn status(&self) -> &Arc<FeedStatus> {
        &self.status
    }

    /// Publish the capacity as plain text; never fails the caller
    pub fn publish_capacity(&self, capacity: i32) {
        match self.try_publish_capacity(capacity) {
            Ok(()) => tracing::info!("Published capacity: {} to {}", capacity, self.topic),
            Err(e) => tracing::error!("Capacity {} not published: {}", capacity, e),
        }
    }

    /// Queue the capacity message; `FeedUnreachable` when there is no live
    /// connection or the request queue rejects it
    pub fn try_publish_capacity(&self, capacity: i32) -> AppResult<()> {
        let client = match &self.client {
            Some(client) if self.status.is_connected() => client,
            _ => return Err(AppError::FeedUnreachable("MQTT client not connected".to_string())),
        };
        client.try_publish(self.topic.as_str(), QoS::AtLeastOnce, false, capacity.to_string())?;
        Ok(())
    }
}
