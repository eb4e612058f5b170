//! Client configuration
//!
//! Environment first: `DIWAN_API_BASE` is the single base-URL override.
//! `DIWAN_CONFIG` may point at a TOML file for the rest; environment
//! values win over file values.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the backend; `/api` is appended by the API client.
    pub api_base: String,

    /// Print the assistant welcome banner when entering a chat.
    pub show_welcome: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            show_welcome: true,
        }
    }
}

fn default_api_base() -> String {
    "http://localhost:8000".to_string()
}

impl Config {
    /// Resolve configuration: defaults, then `DIWAN_CONFIG` file if set,
    /// then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("DIWAN_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };

        if let Ok(base) = env::var("DIWAN_API_BASE") {
            config.api_base = base;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(content)?;
        Ok(Self {
            api_base: file.api.base_url.unwrap_or_else(default_api_base),
            show_welcome: file.ui.show_welcome,
        })
    }
}

/// On-disk layout of the optional config file.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    api: ApiSection,

    #[serde(default)]
    ui: UiSection,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    #[serde(default)]
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UiSection {
    #[serde(default = "default_true")]
    show_welcome: bool,
}

impl Default for UiSection {
    fn default() -> Self {
        Self { show_welcome: true }
    }
}

fn default_true() -> bool {
    true
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
