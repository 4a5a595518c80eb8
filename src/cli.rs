use std::path::PathBuf;
use clap::Parser;
use crate::config::{OutputFormat, WatchMode, WatchStateConfig};
use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "watchstate")]
#[command(version)]
#[command(about = "Report created, modified and deleted files under a directory")]
#[command(long_about = "watchstate watches a directory tree and reports file creations, modifications and deletions. \
A file counts as modified when its modification time moves; its size and content checksum are recorded on every change. \
Paths are filtered by regular expression patterns, and any path containing `git` is ignored.")]
pub struct Cli {
    /// Directory to watch for changes
    #[arg(value_name = "PATH", help = "Path to watch (defaults to current directory)")]
    pub path: Option<PathBuf>,

    /// Regex patterns searched anywhere in the path
    #[arg(value_name = "PATTERN", help = "Only track paths matching one of these regexes")]
    pub patterns: Vec<String>,

    /// Watch mode - which notification backend to use
    #[arg(short, long, help = "File watching mode")]
    pub mode: Option<WatchMode>,

    /// Polling interval in milliseconds (for polling mode)
    #[arg(long, help = "Polling interval in ms")]
    pub poll_interval: Option<u64>,

    /// Record existing files before watching
    #[arg(long, help = "Record the state of existing files at startup")]
    pub baseline: bool,

    /// Output format
    #[arg(short, long, help = "Output format")]
    pub output: Option<OutputFormat>,

    /// Disable colors in output
    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    /// Configuration file
    #[arg(short, long, value_name = "FILE", help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Cli {
    pub fn get_watch_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        })
    }

    /// Load the configuration file and environment, then apply flags on top.
    pub fn resolve_config(&self) -> Result<WatchStateConfig> {
        let mut config = WatchStateConfig::load_or_default(self.config.as_deref())?;
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_to(&self, config: &mut WatchStateConfig) {
        if !self.patterns.is_empty() {
            config.watcher.patterns = self.patterns.clone();
        }
        if let Some(mode) = self.mode {
            config.watcher.mode = mode;
        }
        if let Some(ms) = self.poll_interval {
            config.watcher.poll_interval_ms = ms;
        }
        if self.baseline {
            config.watcher.baseline = true;
        }
        if let Some(format) = self.output {
            config.output.format = format;
        }
        if self.no_color {
            config.output.no_color = true;
        }
    }

    pub fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }

    pub fn validate(&self) -> Result<(), String> {
        let path = self.get_watch_path();

        if !path.exists() {
            return Err(format!("Path does not exist: {}", path.display()));
        }

        if !path.is_dir() {
            return Err(format!("Path is not a directory: {}", path.display()));
        }

        if self.poll_interval == Some(0) {
            return Err("Poll interval must be greater than 0".to_string());
        }

        Ok(())
    }
}
