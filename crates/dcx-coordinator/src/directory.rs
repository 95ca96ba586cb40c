//! Live display worker discovery

use std::sync::Arc;

use dcx_core::config::CoordinatorConfig;
use dcx_core::traits::MessageBroker;
use dcx_core::types::{DisplayName, WorkerEndpoint};
use dcx_core::DcxError;

/// Finds the display workers currently able to answer requests.
///
/// Nothing is cached: every call asks the broker for its channel listing and
/// keeps the reply channels that follow the worker naming convention and have
/// a serving consumer.
pub struct WorkerDirectory {
    broker: Arc<dyn MessageBroker>,
    config: Arc<CoordinatorConfig>,
}

impl WorkerDirectory {
    /// Create a directory over `broker`
    pub fn new(broker: Arc<dyn MessageBroker>, config: Arc<CoordinatorConfig>) -> Self {
        Self { broker, config }
    }

    /// Current live workers, ordered by display name.
    ///
    /// A failing listing call is a transport error and propagates as such.
    pub async fn discover(&self) -> Result<Vec<WorkerEndpoint>, DcxError> {
        let channels = self.broker.list_channels().await?;

        let mut endpoints: Vec<WorkerEndpoint> = channels
            .into_iter()
            .filter(|channel| channel.state.is_serving())
            .filter_map(|channel| {
                let display_name = self.classify(&channel.name)?;
                Some(WorkerEndpoint {
                    display_name,
                    channel: channel.name,
                    state: channel.state,
                })
            })
            .collect();

        endpoints.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        endpoints.dedup_by(|a, b| a.display_name == b.display_name);

        tracing::debug!(
            "Discovered {} display workers: {:?}",
            endpoints.len(),
            endpoints
                .iter()
                .map(|e| e.display_name.as_str())
                .collect::<Vec<_>>()
        );

        Ok(endpoints)
    }

    /// Display name of a worker reply channel, `None` for any other channel
    pub fn classify(&self, channel: &str) -> Option<DisplayName> {
        self.config
            .display_for_channel(channel)
            .map(DisplayName::from)
    }

    /// Reply channel of a display worker
    pub fn channel_for(&self, display_name: &DisplayName) -> String {
        self.config.reply_channel(display_name.as_str())
    }
}
