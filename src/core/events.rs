use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::Serialize;
use super::state::FileState;

/// Raw event kinds consumed from the notification source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Rejected by the pattern set or the `git` substring rule.
    OutOfScope,
    /// Not on disk (or not a regular file) when the event was handled.
    Missing,
    /// Existed but could not be read to completion.
    Unreadable,
}

/// What the tracker concluded about a single raw event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Created {
        path: PathBuf,
        state: FileState,
    },
    /// Modification time moved since the recorded state.
    Modified {
        path: PathBuf,
        old_size: u64,
        new_size: u64,
        state: FileState,
    },
    /// Modify event with the same modification time as the recorded state.
    /// The stored hash is still refreshed.
    Unchanged {
        path: PathBuf,
        state: FileState,
    },
    /// Modify event for a path with no recorded state; it becomes the baseline.
    Baseline {
        path: PathBuf,
        state: FileState,
    },
    Deleted {
        path: PathBuf,
        previous: Option<FileState>,
    },
    Ignored {
        path: PathBuf,
        reason: IgnoreReason,
    },
}

impl Outcome {
    pub fn path(&self) -> &Path {
        match self {
            Outcome::Created { path, .. }
            | Outcome::Modified { path, .. }
            | Outcome::Unchanged { path, .. }
            | Outcome::Baseline { path, .. }
            | Outcome::Deleted { path, .. }
            | Outcome::Ignored { path, .. } => path,
        }
    }

    /// State recorded for the path after this outcome, if any.
    pub fn state(&self) -> Option<&FileState> {
        match self {
            Outcome::Created { state, .. }
            | Outcome::Modified { state, .. }
            | Outcome::Unchanged { state, .. }
            | Outcome::Baseline { state, .. } => Some(state),
            Outcome::Deleted { .. } | Outcome::Ignored { .. } => None,
        }
    }

    /// Created, modified and deleted outcomes are worth telling a user about.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            Outcome::Created { .. } | Outcome::Modified { .. } | Outcome::Deleted { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Created { .. } => "created",
            Outcome::Modified { .. } => "modified",
            Outcome::Unchanged { .. } => "unchanged",
            Outcome::Baseline { .. } => "baseline",
            Outcome::Deleted { .. } => "deleted",
            Outcome::Ignored { .. } => "ignored",
        }
    }
}

/// An outcome stamped with the time it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct FileEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl FileEvent {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            timestamp: Utc::now(),
            outcome,
        }
    }

    pub fn path(&self) -> &Path {
        self.outcome.path()
    }
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    FileChanged(FileEvent),
    /// The notification source reported an error; the session is no longer reliable.
    WatchFailed(String),
}
