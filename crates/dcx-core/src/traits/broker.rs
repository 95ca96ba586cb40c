//! Message broker traits

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::TransportError;
use crate::types::ChannelState;
use dcx_protocol::topic::topic_matches;

/// One channel known to the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channel name
    pub name: String,
    /// Consumer state
    pub state: ChannelState,
}

/// A message delivered on a topic
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMessage {
    pub topic: String,
    pub payload: Value,
}

/// Broker-native channel lifecycle notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel was deleted, typically because its consumer died
    Destroyed { name: String },
}

/// Abstraction over the message broker connecting coordinator and workers
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Send `body` to the consumer of `channel` and wait for its reply.
    ///
    /// Timeouts are the caller's concern.
    async fn call(&self, channel: &str, body: Value) -> Result<Value, TransportError>;

    /// Publish `payload` on `topic`
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), TransportError>;

    /// Subscribe to every topic matching `pattern`
    async fn subscribe(&self, pattern: &str) -> Result<Subscription, TransportError>;

    /// List all channels with their consumer state
    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, TransportError>;

    /// Receive channel lifecycle notifications
    async fn watch_channels(&self) -> Result<broadcast::Receiver<ChannelEvent>, TransportError>;
}

/// Topic subscription filtered by pattern
pub struct Subscription {
    pattern: String,
    rx: broadcast::Receiver<TopicMessage>,
}

impl Subscription {
    /// Wrap a receiver carrying every published message
    pub fn new(pattern: impl Into<String>, rx: broadcast::Receiver<TopicMessage>) -> Self {
        Self {
            pattern: pattern.into(),
            rx,
        }
    }

    /// Next message matching the pattern, or `None` once the broker is gone
    pub async fn recv(&mut self) -> Option<TopicMessage> {
        loop {
            match self.rx.recv().await {
                Ok(message) if topic_matches(&self.pattern, &message.topic) => {
                    return Some(message)
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Subscription {} lagged by {} messages", self.pattern, n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
