use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Topic-style publisher.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &serde_json::Value) -> Result<()>;
}

/// A published message as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub exchange: String,
    pub routing_key: String,
    pub payload: serde_json::Value,
    pub published_at: DateTime<Utc>,
}

/// In-process fan-out over a `tokio::sync::broadcast` channel.
///
/// Slow subscribers lag and drop old events rather than blocking publishers.
pub struct BroadcastBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventBus for BroadcastBus {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &serde_json::Value) -> Result<()> {
        let envelope = EventEnvelope {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            payload: payload.clone(),
            published_at: Utc::now(),
        };
        match self.sender.send(envelope) {
            Ok(receivers) => debug!(%exchange, %routing_key, receivers, "Event published"),
            // No subscribers is not a failure for a broadcast.
            Err(_) => debug!(%exchange, %routing_key, "Event published with no subscribers"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_envelopes() {
        let bus = BroadcastBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish("ops.selfhealing", "analyze", &serde_json::json!({"anomalies": []}))
            .await
            .unwrap();

        let env = rx.recv().await.unwrap();
        assert_eq!(env.exchange, "ops.selfhealing");
        assert_eq!(env.routing_key, "analyze");
        assert_eq!(env.payload["anomalies"], serde_json::json!([]));
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = BroadcastBus::new(0);
        let result = tokio_test::block_on(bus.publish("ops.selfhealing", "heal", &serde_json::json!({})));
        assert!(result.is_ok());
    }
}
