//! # Telemetry Hub
//!
//! Fans each engine snapshot out to every connected subscriber.
//!
//! Delivery is best effort. A snapshot is encoded once, then written to
//! each subscriber in turn while the registry lock is held. A subscriber
//! whose write fails or outlasts the write timeout is closed and dropped on
//! the spot; there is no retry and no per-subscriber queue, so one slow
//! peer delays the ones after it by at most the write timeout.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use chrono::Utc;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio::time::timeout;
use uuid::Uuid;

use swarm_domain::Drone;
use swarm_simulator::TickObserver;

use crate::error::HubError;

/// Wire envelope pushed to subscribers once per tick.
#[derive(Debug, Serialize)]
pub struct TelemetryMessage<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub drones: &'a [Drone],
}

impl<'a> TelemetryMessage<'a> {
    pub fn new(drones: &'a [Drone]) -> Self {
        Self {
            kind: "telemetry",
            timestamp: Utc::now().timestamp_millis(),
            drones,
        }
    }
}

/// Outbound half of a subscriber connection.
#[async_trait]
pub trait TelemetrySink: Send {
    async fn send_text(&mut self, payload: Utf8Bytes) -> Result<(), HubError>;

    async fn close(&mut self);
}

/// [`TelemetrySink`] over the write half of an axum WebSocket.
pub struct WsSink(pub SplitSink<WebSocket, Message>);

#[async_trait]
impl TelemetrySink for WsSink {
    async fn send_text(&mut self, payload: Utf8Bytes) -> Result<(), HubError> {
        self.0
            .send(Message::Text(payload))
            .await
            .map_err(|e| HubError::Send(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(err) = self.0.close().await {
            tracing::debug!(error = %err, "WebSocket close failed");
        }
    }
}

/// Default bound on a single subscriber write or close.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

struct Subscriber {
    sink: Box<dyn TelemetrySink>,
    reader: Option<AbortHandle>,
}

/// Registry of live subscribers.
pub struct Hub {
    subscribers: Mutex<HashMap<Uuid, Subscriber>>,
    write_timeout: Duration,
}

impl Default for Hub {
    fn default() -> Self {
        Self::with_write_timeout(DEFAULT_WRITE_TIMEOUT)
    }
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub whose subscriber writes give up after `write_timeout`.
    pub fn with_write_timeout(write_timeout: Duration) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            write_timeout,
        }
    }

    pub const fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Register a subscriber and start watching its inbound side.
    ///
    /// Inbound items are discarded. The subscriber is removed and closed
    /// when `inbound` yields an error or ends.
    pub async fn subscribe<S, R, T, E>(self: &Arc<Self>, sink: S, inbound: R) -> Uuid
    where
        S: TelemetrySink + 'static,
        R: Stream<Item = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let id = Uuid::new_v4();
        // The reader is spawned under the lock so it cannot unregister an
        // id that is not in the map yet.
        let mut subscribers = self.subscribers.lock().await;
        let hub = Arc::clone(self);
        let reader = tokio::spawn(async move {
            let mut inbound = std::pin::pin!(inbound);
            while let Some(item) = inbound.next().await {
                if let Err(err) = item {
                    tracing::debug!(subscriber = %id, error = %err, "Subscriber read failed");
                    break;
                }
            }
            hub.remove(id, false).await;
        });
        subscribers.insert(
            id,
            Subscriber {
                sink: Box::new(sink),
                reader: Some(reader.abort_handle()),
            },
        );
        tracing::info!(subscriber = %id, total = subscribers.len(), "Subscriber connected");

        id
    }

    /// Remove and close a subscriber and stop its reader. Returns whether it
    /// was still registered.
    pub async fn unsubscribe(&self, id: Uuid) -> bool {
        self.remove(id, true).await
    }

    async fn remove(&self, id: Uuid, stop_reader: bool) -> bool {
        let mut subscribers = self.subscribers.lock().await;
        let Some(subscriber) = subscribers.remove(&id) else {
            return false;
        };
        self.close(id, subscriber, stop_reader).await;
        tracing::info!(subscriber = %id, total = subscribers.len(), "Subscriber disconnected");
        true
    }

    async fn close(&self, id: Uuid, mut subscriber: Subscriber, stop_reader: bool) {
        if let Some(reader) = subscriber.reader.take().filter(|_| stop_reader) {
            reader.abort();
        }
        if timeout(self.write_timeout, subscriber.sink.close()).await.is_err() {
            tracing::debug!(subscriber = %id, "Subscriber close timed out");
        }
    }

    /// Push one snapshot to every subscriber.
    ///
    /// Returns the number of successful deliveries. Fails only if the
    /// snapshot cannot be encoded, in which case nobody receives it.
    pub async fn broadcast(&self, drones: &[Drone]) -> Result<usize, HubError> {
        let payload = Utf8Bytes::from(serde_json::to_string(&TelemetryMessage::new(drones))?);

        let mut subscribers = self.subscribers.lock().await;
        let mut failed = Vec::new();
        for (id, subscriber) in subscribers.iter_mut() {
            let sent = timeout(self.write_timeout, subscriber.sink.send_text(payload.clone()))
                .await
                .unwrap_or_else(|_| Err(HubError::WriteTimeout(self.write_timeout)));
            if let Err(err) = sent {
                tracing::warn!(subscriber = %id, error = %err, "Dropping subscriber");
                failed.push(*id);
            }
        }

        for id in failed {
            if let Some(subscriber) = subscribers.remove(&id) {
                self.close(id, subscriber, true).await;
            }
        }

        Ok(subscribers.len())
    }

    pub async fn len(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.lock().await.is_empty()
    }
}

#[async_trait]
impl TickObserver for Hub {
    async fn on_tick(&self, snapshot: &[Drone]) {
        match self.broadcast(snapshot).await {
            Ok(delivered) => tracing::trace!(delivered, "Telemetry broadcast"),
            Err(err) => tracing::error!(error = %err, "Telemetry broadcast abandoned"),
        }
    }
}
