//! Headless client configuration.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/wakemate/wakemate.toml`
//! - Windows: `%APPDATA%/wakemate/wakemate.toml`

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use wakemate_connection::DiscoveryConfig;

const CONFIG_FILE: &str = "wakemate.toml";

/// Headless client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Key-value store file. Defaults to `storage.json` next to this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    /// Scan order, port and timeouts.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl AppConfig {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("invalid config {}", path.display()))?;
            Ok(config)
        } else {
            let config = AppConfig::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    wakemate_connection::store::config_dir()
        .map(|dir| dir.join("wakemate").join(CONFIG_FILE))
        .context("no configuration directory on this platform")
}
