//! Fan-out of live events to connected subscribers

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// One event, rendered once as the `{"event": ..., "data": ...}` frame sent to clients
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    pub event: String,
    pub json: Arc<str>,
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    event: &'a str,
    data: &'a T,
}

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("Failed to encode event: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Live event hub.
///
/// Subscribers only see events published after they subscribed. A subscriber
/// that falls more than the channel capacity behind loses the oldest events
/// instead of slowing down the publisher.
#[derive(Clone)]
pub struct BroadcastHub {
    sender: broadcast::Sender<BroadcastMessage>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        let (shutdown, _) = watch::channel(false);
        Self {
            sender,
            shutdown: Arc::new(shutdown),
        }
    }

    /// Publish `payload` under `event`; returns how many subscribers it reached
    pub fn publish<T: Serialize>(&self, event: &str, payload: &T) -> Result<usize, BroadcastError> {
        let json = serde_json::to_string(&Envelope { event, data: payload })?;
        let message = BroadcastMessage {
            event: event.to_string(),
            json: json.into(),
        };

        // An error here only means nobody is listening
        Ok(self.sender.send(message).unwrap_or(0))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Tell every subscriber loop to finish
    pub fn close(&self) {
        self.shutdown.send_replace(true);
    }

    /// Resolves once [`close`](Self::close) has been called
    pub async fn closed(&self) {
        let mut receiver = self.shutdown.subscribe();
        // The sender lives in self, so this only ends when the flag flips
        let _ = receiver.wait_for(|closed| *closed).await;
    }
}
