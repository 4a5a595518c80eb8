//! Configuration management for watchstate
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `WATCHSTATE_*` environment variables. Command-line flags are applied last
//! by [`crate::cli::Cli::resolve_config`].

use std::path::Path;
use std::time::Duration;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use crate::core::PatternMatcher;
use crate::error::{Result, WatchError};

/// Global configuration for watchstate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchStateConfig {
    /// File watcher configuration
    pub watcher: WatcherConfig,
    /// Outcome rendering configuration
    pub output: OutputConfig,
}

/// Configuration for file watching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Regex search patterns; empty tracks every file
    pub patterns: Vec<String>,
    /// Which notification backend to use
    pub mode: WatchMode,
    /// Polling interval in milliseconds (polling mode only)
    pub poll_interval_ms: u64,
    /// Record the state of existing files before watching
    pub baseline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// Native events, falling back to polling when unavailable
    Auto,
    /// Use native file system events
    Native,
    /// Use polling-based watching
    Polling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Log lines (default)
    Text,
    /// JSON output for scripting
    Json,
    /// Compact single-line format
    Compact,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            mode: WatchMode::Auto,
            poll_interval_ms: 1000,
            baseline: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            no_color: false,
        }
    }
}

impl WatcherConfig {
    /// Get polling interval duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl WatchStateConfig {
    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|err| WatchError::Config(err.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Load from `path` if given, otherwise defaults, then apply the environment
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Override with environment variables if present
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("WATCHSTATE_PATTERNS") {
            self.watcher.patterns = val
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(val) = std::env::var("WATCHSTATE_POLL_INTERVAL_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                self.watcher.poll_interval_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("WATCHSTATE_BASELINE") {
            if let Ok(baseline) = val.parse::<bool>() {
                self.watcher.baseline = baseline;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.watcher.poll_interval_ms == 0 {
            return Err(WatchError::Config(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        PatternMatcher::new(self.watcher.patterns.iter().cloned())?;

        Ok(())
    }
}
