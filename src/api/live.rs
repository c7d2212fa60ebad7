//! WebSocket live-push channel
//!
//! Each connection gets a fresh snapshot, then every broadcast batch as
//! `{"event": ..., "data": ...}` text frames. Client frames are ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};

use crate::{models::notification::Notification, AppState};

/// Upgrade to a live-update subscription
pub async fn live_updates(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state))
}

async fn serve_subscriber(socket: WebSocket, state: AppState) {
    let gateway = &state.services.gateway;
    let mut subscription = gateway.hub().subscribe();
    let id = subscription.id();
    tracing::info!(subscriber = %id, "Live client connected");

    let (mut sender, mut receiver) = socket.split();

    match gateway.welcome_batch().await {
        Ok(batch) => {
            if send_batch(&mut sender, &batch).await.is_err() {
                return;
            }
        }
        Err(e) => tracing::warn!(subscriber = %id, "Could not build initial snapshot: {}", e),
    }

    loop {
        tokio::select! {
            batch = subscription.recv() => match batch {
                Some(batch) => {
                    if send_batch(&mut sender, &batch).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!(subscriber = %id, "Live client disconnected");
}

async fn send_batch(
    sender: &mut SplitSink<WebSocket, Message>,
    batch: &[Notification],
) -> Result<(), axum::Error> {
    for notification in batch {
        let frame = match serde_json::to_string(notification) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Failed to encode {}: {}", notification.name(), e);
                continue;
            }
        };
        sender.send(Message::Text(frame)).await?;
    }
    Ok(())
}
