//! Sensor event ingestor
//!
//! Drives the MQTT event loop: subscribes on every connection
//! acknowledgement, turns `add`/`remove` payloads into ledger writes and
//! hands the resulting notification to the gateway. Connection loss is
//! retried with backoff; messages published during an outage are lost.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet, QoS};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    config::MqttConfig,
    error::AppResult,
    models::{notification::RealtimeEvent, visitor_event::VisitorEventType},
    time,
};

use super::{
    feed::{FeedStatus, ReconnectBackoff},
    gateway::Gateway,
    ledger::OccupancyLedger,
};

const RECONNECT_BASE: Duration = Duration::from_millis(500);
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct SensorIngestor {
    topic_sensor: String,
    ledger: OccupancyLedger,
    gateway: Gateway,
    status: Arc<FeedStatus>,
}

impl SensorIngestor {
    pub fn new(config: &MqttConfig, ledger: OccupancyLedger, gateway: Gateway) -> Self {
        let status = Arc::clone(gateway.feed().status());
        Self {
            topic_sensor: config.topic_sensor.clone(),
            ledger,
            gateway,
            status,
        }
    }

    /// Event type carried by a message, if it is a valid sensor signal
    pub fn classify(&self, topic: &str, payload: &[u8]) -> Option<VisitorEventType> {
        if topic != self.topic_sensor {
            tracing::debug!("Ignoring message on unrelated topic {}", topic);
            return None;
        }
        let event_type = VisitorEventType::from_sensor_payload(payload);
        if event_type.is_none() {
            tracing::warn!("Unknown sensor message: {}", String::from_utf8_lossy(payload));
        }
        event_type
    }

    /// Handle one incoming message; failures are logged, never propagated
    pub async fn handle_message(&self, topic: &str, payload: &[u8]) {
        let now = Utc::now();
        self.status.record_message(now);
        tracing::debug!("Received: {} -> {}", topic, String::from_utf8_lossy(payload));

        let Some(event_type) = self.classify(topic, payload) else {
            return;
        };

        match self.process(event_type, now).await {
            Ok(event) => {
                tracing::info!(
                    "Processed {} event. Current visitors: {}",
                    event_type,
                    event.current_visitors
                );
                self.gateway.publish_visitor_event(event).await;
            }
            Err(e) => tracing::error!("Error processing {} event: {}", event_type, e),
        }
    }

    /// Ledger writes for one event: log, count, hourly rollup
    pub async fn process(&self, event_type: VisitorEventType, now: DateTime<Utc>) -> AppResult<RealtimeEvent> {
        let tz = self.ledger.tz();

        self.ledger.append_event(event_type, now).await?;
        let current_visitors = self.ledger.adjust_current_visitors(event_type.delta()).await?;
        self.ledger
            .upsert_hourly_aggregate(
                time::local_date(now, tz),
                time::local_hour(now, tz),
                event_type,
                current_visitors,
            )
            .await?;

        Ok(RealtimeEvent::new(event_type, now, tz, current_visitors))
    }

    /// Poll the broker until shutdown, then disconnect cleanly
    pub async fn run(
        self,
        client: AsyncClient,
        mut eventloop: EventLoop,
        reconnect_max: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut backoff = ReconnectBackoff::new(RECONNECT_BASE, reconnect_max);
        tracing::info!("Connecting to MQTT broker...");

        while !*shutdown.borrow() {
            tokio::select! {
                _ = shutdown.changed() => break,
                polled = eventloop.poll() => match polled {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        self.status.set_connected(true);
                        backoff.reset();
                        tracing::info!("Connected to MQTT broker");
                        match self.subscribe(&client) {
                            Ok(()) => tracing::info!("Subscribed to {}", self.topic_sensor),
                            Err(e) => tracing::error!("MQTT subscription error: {}", e),
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        self.handle_message(&publish.topic, &publish.payload).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.status.set_connected(false);
                        let delay = backoff.next_delay();
                        tracing::warn!("Sensor feed unreachable: {}; reconnecting in {:?}", e, delay);
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = shutdown.changed() => break,
                        }
                    }
                }
            }
        }

        self.disconnect(&client, &mut eventloop).await;
    }

    /// Queue the sensor-topic subscription on the client
    pub fn subscribe(&self, client: &AsyncClient) -> AppResult<()> {
        client.try_subscribe(self.topic_sensor.as_str(), QoS::AtMostOnce)?;
        Ok(())
    }

    async fn disconnect(&self, client: &AsyncClient, eventloop: &mut EventLoop) {
        if self.status.is_connected() && client.try_disconnect().is_ok() {
            // Drive the event loop until the DISCONNECT packet is written
            let _ = tokio::time::timeout(DISCONNECT_GRACE, async {
                while let Ok(event) = eventloop.poll().await {
                    if matches!(event, Event::Outgoing(Outgoing::Disconnect)) {
                        break;
                    }
                }
            })
            .await;
        }
        self.status.set_connected(false);
        tracing::info!("Disconnected from MQTT broker");
    }
}

/// Periodically warn when the feed has been silent for too long
pub fn spawn_health_monitor(
    status: Arc<FeedStatus>,
    interval: Duration,
    stale_after: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        // First tick fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    if status.is_stale(Utc::now(), stale_after) {
                        tracing::warn!(
                            last_message = %status.last_message_at(),
                            "No sensor messages received in {:?} - connection may be stale",
                            stale_after
                        );
                    }
                }
            }
        }
    })
}
