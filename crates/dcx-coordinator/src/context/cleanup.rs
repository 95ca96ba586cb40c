//! Worker removal listener
//!
//! Each display context runs one background task watching two signals:
//!
//! - the removal topic, on which workers announce an orderly shutdown
//! - the broker's channel-destroyed notifications, which also cover workers
//!   that crashed without announcing anything
//!
//! Both lead to the same pruning routine. The task holds only a weak
//! reference to its context and stops when the context is dropped (its
//! cancellation token fires) or when both signal sources have closed.

use std::sync::{Arc, Weak};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use dcx_core::config::CoordinatorConfig;
use dcx_core::traits::{ChannelEvent, Subscription};
use dcx_core::types::DisplayName;
use dcx_protocol::topic;

use super::DisplayContext;

/// Spawn the removal listener for one context.
///
/// # Arguments
///
/// * `context` - The context to prune
/// * `removals` - Subscription to the removal topic
/// * `channel_events` - Broker channel notifications
/// * `config` - Used to map destroyed channel names back to display names
/// * `cancel` - Cancellation token fired when the context is dropped
pub(super) fn spawn_removal_listener(
    context: Weak<DisplayContext>,
    removals: Subscription,
    channel_events: broadcast::Receiver<ChannelEvent>,
    config: Arc<CoordinatorConfig>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_removal_listener(
        context,
        removals,
        channel_events,
        config,
        cancel,
    ))
}

async fn run_removal_listener(
    context: Weak<DisplayContext>,
    mut removals: Subscription,
    mut channel_events: broadcast::Receiver<ChannelEvent>,
    config: Arc<CoordinatorConfig>,
    cancel: CancellationToken,
) {
    let mut removals_open = true;
    let mut events_open = true;

    while removals_open || events_open {
        let display_name = tokio::select! {
            _ = cancel.cancelled() => break,
            message = removals.recv(), if removals_open => match message {
                Some(message) => match topic::removed_display(&message.payload) {
                    Some(name) => DisplayName::from(name),
                    None => {
                        tracing::warn!(
                            "Ignoring removal message without a display name: {}",
                            message.payload
                        );
                        continue;
                    }
                },
                None => {
                    tracing::debug!("Removal subscription closed");
                    removals_open = false;
                    continue;
                }
            },
            event = channel_events.recv(), if events_open => match event {
                Ok(ChannelEvent::Destroyed { name }) => match config.display_for_channel(&name) {
                    Some(display) => DisplayName::from(display),
                    // Not a display worker's reply channel
                    None => continue,
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Channel watcher lagged, {} notifications skipped", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Channel watcher closed");
                    events_open = false;
                    continue;
                }
            },
        };

        let Some(context) = context.upgrade() else {
            break;
        };
        context.remove_display(&display_name).await;
    }

    tracing::debug!("Removal listener stopped");
}
