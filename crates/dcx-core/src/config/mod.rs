//! Configuration management for dcx

mod coordinator;
pub mod serde_utils;

pub use coordinator::CoordinatorConfig;

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dcx")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bounds, WindowLayout};

    #[test]
    fn test_load_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        match load_config::<CoordinatorConfig>(&path) {
            Err(ConfigError::NotFound(p)) => assert_eq!(p, path),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_save_then_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = CoordinatorConfig::default();
        config.active_context_key = "wall:active".to_string();
        config.default_layout.insert(
            "main".to_string(),
            WindowLayout::new("left", Bounds::new(0.0, 0.0, 1280.0, 720.0)),
        );
        save_config(&path, &config).unwrap();

        let loaded: CoordinatorConfig = load_config(&path).unwrap();
        assert_eq!(loaded.active_context_key, "wall:active");
        assert_eq!(loaded.default_layout["main"].display_name, "left");
        assert_eq!(loaded.default_layout["main"].bounds.width, 1280.0);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "rpc_timeout = 2.5\n").unwrap();

        let loaded: CoordinatorConfig = load_config(&path).unwrap();
        assert_eq!(loaded.rpc_timeout, std::time::Duration::from_millis(2500));
        assert_eq!(loaded.worker_channel_prefix, "rpc-display-");
    }
}
