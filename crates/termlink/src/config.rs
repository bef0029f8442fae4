//! Configuration management

use crate::session::SessionOptions;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Terminal host connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// WebSocket endpoint of the terminal host
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_endpoint() -> String {
    "ws://127.0.0.1:8129".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
        }
    }
}

/// Session spawn configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Shell type requested from the host
    #[serde(default = "default_terminal_type")]
    pub terminal_type: String,
    /// Working directory for spawned shells (host-side)
    #[serde(default)]
    pub working_dir: String,
    /// Wait between spawn confirmation and the first resize, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_terminal_type() -> String {
    "bash".to_string()
}

fn default_settle_delay_ms() -> u64 {
    100
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            terminal_type: default_terminal_type(),
            working_dir: String::new(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

/// Main client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Terminal host connection
    #[serde(default)]
    pub host: HostConfig,
    /// Session spawn parameters
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Return default config if file doesn't exist
            Ok(Config::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "termlink", "Termlink")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Session options for a client owned by `owner`.
    pub fn session_options(&self, owner: &str) -> SessionOptions {
        SessionOptions {
            owner: owner.to_string(),
            terminal_type: self.session.terminal_type.clone(),
            working_dir: self.session.working_dir.clone(),
            settle_delay: Duration::from_millis(self.session.settle_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host.endpoint, "ws://127.0.0.1:8129");
        assert_eq!(config.session.terminal_type, "bash");
        assert_eq!(config.session.settle_delay_ms, 100);
        assert!(config.session.working_dir.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.host.endpoint, config.host.endpoint);
        assert_eq!(parsed.session.terminal_type, config.session.terminal_type);
    }

    #[test]
    fn test_load_from_file_with_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[host]\nendpoint = \"ws://10.0.0.2:9000\"\n\n[session]\nterminal_type = \"zsh\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.host.endpoint, "ws://10.0.0.2:9000");
        assert_eq!(config.session.terminal_type, "zsh");
        // Unspecified fields fall back to defaults
        assert_eq!(config.session.settle_delay_ms, 100);
    }

    #[test]
    fn test_session_options_from_config() {
        let config = Config::default();
        let options = config.session_options("agent");
        assert_eq!(options.owner, "agent");
        assert_eq!(options.terminal_type, "bash");
        assert_eq!(options.settle_delay, Duration::from_millis(100));
    }
}
