//! Configuration file handling
//!
//! Precedence: built-in defaults, then `~/.config/triage/config.toml`
//! (or an explicit `--config` path), then CLI flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use triage_errors::Error;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
}

/// Defaults for the `run` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub workdir: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            timeout_seconds: None,
            workdir: None,
            output: None,
        }
    }
}

fn default_retries() -> u32 {
    5
}

impl Config {
    /// Load the config file, or fall back to defaults when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error when an explicitly given path cannot be read or
    /// any config file fails to parse.
    pub async fn load_or_default(explicit: Option<&Path>) -> Result<Self, Error> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_path() {
                Some(path) if path.is_file() => path,
                _ => return Ok(Self::default()),
            },
        };
        let text = fs::read_to_string(&path)
            .await
            .map_err(|e| Error::io_with_path(&e, &path))?;
        toml::from_str(&text)
            .map_err(|e| Error::internal(format!("config {}: {e}", path.display())))
    }
}

fn default_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("triage/config.toml"));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config/triage/config.toml"))
}
