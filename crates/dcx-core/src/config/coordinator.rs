//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_secs;
use crate::error::ConfigError;
use crate::types::LayoutMap;

/// Configuration for a display context coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Name prefix of display worker reply channels; the rest is the display name
    pub worker_channel_prefix: String,

    /// Shared store key holding the active context name
    pub active_context_key: String,

    /// Upper bound on every worker RPC
    #[serde(with = "duration_secs")]
    pub rpc_timeout: Duration,

    /// Topic on which workers announce their orderly removal
    pub removal_topic: String,

    /// Layout used when neither the caller nor any worker declares one
    pub default_layout: LayoutMap,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            worker_channel_prefix: "rpc-display-".to_string(),
            active_context_key: "display:dc".to_string(),
            rpc_timeout: Duration::from_secs(10),
            removal_topic: dcx_protocol::topic::DISPLAY_REMOVED.to_string(),
            default_layout: LayoutMap::new(),
        }
    }
}

impl CoordinatorConfig {
    /// Reply channel name of a display worker
    pub fn reply_channel(&self, display_name: &str) -> String {
        format!("{}{}", self.worker_channel_prefix, display_name)
    }

    /// Display name encoded in a reply channel name, if it is one
    pub fn display_for_channel<'a>(&self, channel: &'a str) -> Option<&'a str> {
        channel
            .strip_prefix(&self.worker_channel_prefix)
            .filter(|name| !name.is_empty())
    }

    /// Reject configurations the coordinator cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_channel_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "worker_channel_prefix must not be empty".to_string(),
            ));
        }
        if self.active_context_key.is_empty() {
            return Err(ConfigError::Invalid(
                "active_context_key must not be empty".to_string(),
            ));
        }
        if self.rpc_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "rpc_timeout must be greater than zero".to_string(),
            ));
        }
        if let Some((name, layout)) = self
            .default_layout
            .iter()
            .find(|(_, layout)| layout.display_name.is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "default_layout.{} has no display_name (bounds {:?})",
                name, layout.bounds
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_channel_naming() {
        let config = CoordinatorConfig::default();
        let channel = config.reply_channel("left");
        assert_eq!(channel, "rpc-display-left");
        assert_eq!(config.display_for_channel(&channel), Some("left"));
        assert_eq!(config.display_for_channel("rpc-display-"), None);
        assert_eq!(config.display_for_channel("rpc-audio-left"), None);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(CoordinatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let config = CoordinatorConfig {
            rpc_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
