//! Configuration Management
//!
//! Handles persistent configuration storage for kong-admin.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default admin API address
pub const DEFAULT_HOST: &str = "localhost:8001";

/// Default page-size hint sent with collection reads
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Admin API host, optionally with port or scheme
    #[serde(default = "default_host")]
    pub host: String,
    /// Talk HTTPS to the admin API
    #[serde(default)]
    pub use_https: bool,
    /// Never fetch consumers (large installations)
    #[serde(default)]
    pub ignore_consumers: bool,
    /// Cache read results until the next mutation
    #[serde(default = "default_true")]
    pub enable_cache: bool,
    /// Page-size hint; `None` lets the server pick
    #[serde(default = "default_page_size")]
    pub page_size: Option<usize>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> Option<usize> {
    Some(DEFAULT_PAGE_SIZE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            use_https: false,
            ignore_consumers: false,
            enable_cache: true,
            page_size: default_page_size(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("kong-admin").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }
}
