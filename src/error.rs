use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors: bad configuration or a watch source that cannot run.
///
/// Transient per-file problems (out of scope, vanished, unreadable) never
/// show up here; the tracker reports them as [`crate::Outcome::Ignored`].
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid path pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("path does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("file system watcher failed: {0}")]
    Notify(#[from] notify::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("event worker thread panicked")]
    WorkerPanicked,
}

pub type Result<T, E = WatchError> = std::result::Result<T, E>;
