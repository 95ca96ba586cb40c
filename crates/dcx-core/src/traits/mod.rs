//! Core trait definitions

mod broker;
mod store;

pub use broker::{ChannelEvent, ChannelInfo, MessageBroker, Subscription, TopicMessage};
pub use store::SharedStore;
