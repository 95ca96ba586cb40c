//! In-memory message broker

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

use dcx_core::error::TransportError;
use dcx_core::traits::{ChannelEvent, ChannelInfo, MessageBroker, Subscription, TopicMessage};
use dcx_core::types::ChannelState;

/// Consumer of one broker channel: answers every request sent to it
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, body: Value) -> Value;
}

struct Channel {
    state: ChannelState,
    handler: Option<Arc<dyn RequestHandler>>,
}

/// Broker keeping channels, topics and channel events in process
pub struct MemoryBroker {
    channels: DashMap<String, Channel>,
    topics: broadcast::Sender<TopicMessage>,
    channel_events: broadcast::Sender<ChannelEvent>,
    published: Mutex<Vec<TopicMessage>>,
    available: AtomicBool,
}

impl MemoryBroker {
    /// Create a broker with no channels
    pub fn new() -> Self {
        let (topics, _) = broadcast::channel(1024);
        let (channel_events, _) = broadcast::channel(256);
        Self {
            channels: DashMap::new(),
            topics,
            channel_events,
            published: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Attach `handler` as the running consumer of `channel`
    pub fn bind(&self, channel: &str, handler: Arc<dyn RequestHandler>) {
        self.channels.insert(
            channel.to_string(),
            Channel {
                state: ChannelState::Running,
                handler: Some(handler),
            },
        );
    }

    /// Declare a channel without a consumer
    pub fn declare(&self, channel: &str, state: ChannelState) {
        self.channels.insert(
            channel.to_string(),
            Channel {
                state,
                handler: None,
            },
        );
    }

    /// Change the reported state of an existing channel
    pub fn set_state(&self, channel: &str, state: ChannelState) {
        if let Some(mut entry) = self.channels.get_mut(channel) {
            entry.state = state;
        }
    }

    /// Delete a channel and emit its destroyed notification
    pub fn destroy(&self, channel: &str) -> bool {
        let removed = self.channels.remove(channel).is_some();
        if removed {
            // No receivers is fine
            let _ = self.channel_events.send(ChannelEvent::Destroyed {
                name: channel.to_string(),
            });
        }
        removed
    }

    /// Make every operation fail with `BrokerUnavailable` until re-enabled
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Every message published so far, oldest first
    pub fn published(&self) -> Vec<TopicMessage> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Published messages on exactly `topic`
    pub fn published_on(&self, topic: &str) -> Vec<Value> {
        self.published()
            .into_iter()
            .filter(|m| m.topic == topic)
            .map(|m| m.payload)
            .collect()
    }

    fn check(&self) -> Result<(), TransportError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::BrokerUnavailable(
                "memory broker disabled".to_string(),
            ))
        }
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBroker for MemoryBroker {
    async fn call(&self, channel: &str, body: Value) -> Result<Value, TransportError> {
        self.check()?;

        // Clone the handler out so no map guard is held across the await
        let handler = self
            .channels
            .get(channel)
            .and_then(|entry| entry.handler.clone())
            .ok_or_else(|| TransportError::ChannelNotFound(channel.to_string()))?;

        Ok(handler.handle(body).await)
    }

    async fn publish(&self, topic: &str, payload: Value) -> Result<(), TransportError> {
        self.check()?;

        let message = TopicMessage {
            topic: topic.to_string(),
            payload,
        };
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        let _ = self.topics.send(message);
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, TransportError> {
        self.check()?;
        Ok(Subscription::new(pattern, self.topics.subscribe()))
    }

    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, TransportError> {
        self.check()?;
        Ok(self
            .channels
            .iter()
            .map(|entry| ChannelInfo {
                name: entry.key().clone(),
                state: entry.value().state,
            })
            .collect())
    }

    async fn watch_channels(&self) -> Result<broadcast::Receiver<ChannelEvent>, TransportError> {
        self.check()?;
        Ok(self.channel_events.subscribe())
    }
}
