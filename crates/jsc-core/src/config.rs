//! Console configuration.
//!
//! Read from `~/.config/jsc/config.toml` by default. Every field is
//! optional; a missing file means defaults.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};
use crate::format::FunctionStyle;

/// Application directory name under the platform config dir.
pub const APP_DIR: &str = "jsc";

/// Root configuration structure for config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Library names accepted by `:load`, mapped to script URLs.
    pub libraries: HashMap<String, String>,
    /// How callables are rendered in responses.
    pub function_style: FunctionStyle,
    /// Start in multi-line mode.
    pub start_multiline: bool,
    /// Maximum number of history entries kept (unbounded when absent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            libraries: default_libraries(),
            function_style: FunctionStyle::default(),
            start_multiline: false,
            history_limit: None,
        }
    }
}

fn default_libraries() -> HashMap<String, String> {
    HashMap::from([
        (
            "jquery".to_string(),
            "http://code.jquery.com/jquery-latest.min.js".to_string(),
        ),
        (
            "arrx".to_string(),
            "http://static.sberry.me/scripts/arrx-latest.js".to_string(),
        ),
    ])
}

impl ConsoleConfig {
    /// Parses a TOML document. Libraries listed in it are merged over the
    /// builtin ones.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: ConsoleConfig = toml::from_str(content)?;
        for (name, url) in default_libraries() {
            config.libraries.entry(name).or_insert(url);
        }
        Ok(config)
    }

    /// Loads the configuration at `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ConsoleError::config(format!(
                "Failed to read configuration file at {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml(&content).map_err(|e| {
            ConsoleError::config(format!(
                "Failed to parse configuration file at {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Loads the configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_path()?)
    }
}

/// Returns the config directory: `~/.config/jsc`.
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| ConsoleError::config("Could not determine config directory"))
}

/// Returns the path to the configuration file: `~/.config/jsc/config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}
