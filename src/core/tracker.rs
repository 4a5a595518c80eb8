//! Per-file state tracking and event classification.
//!
//! [`FileStateTracker`] owns the map from path to last-known [`FileState`]
//! and turns raw create/modify/delete notifications into [`Outcome`]s.
//! It takes `&mut self` for every event, so a single owner processes events
//! one at a time in the order they were delivered.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, trace, warn};

use super::events::{EventKind, IgnoreReason, Outcome};
use super::filter::PatternMatcher;
use super::state::FileState;

/// Reads the on-disk state of an in-scope path.
pub type StateReader = fn(&Path) -> io::Result<Option<FileState>>;

pub struct FileStateTracker {
    matcher: PatternMatcher,
    reader: StateReader,
    states: HashMap<PathBuf, FileState>,
}

impl FileStateTracker {
    pub fn new(matcher: PatternMatcher) -> Self {
        Self {
            matcher,
            reader: FileState::read,
            states: HashMap::new(),
        }
    }

    /// Replace how file states are read, e.g. to inject read failures.
    pub fn with_reader(mut self, reader: StateReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    pub fn is_in_scope(&self, path: &Path) -> bool {
        self.matcher.matches(&path.to_string_lossy())
    }

    /// Current on-disk state of `path`.
    ///
    /// `Ok(None)` when the path is out of scope or not an existing regular
    /// file. An `Err` means the file could not be read to completion, most
    /// often because it was removed mid-read; callers treat that as absent.
    pub fn compute_state(&self, path: &Path) -> io::Result<Option<FileState>> {
        if !self.is_in_scope(path) {
            return Ok(None);
        }
        (self.reader)(path)
    }

    pub fn handle(&mut self, kind: EventKind, path: &Path) -> Outcome {
        match kind {
            EventKind::Created => self.handle_created(path),
            EventKind::Modified => self.handle_modified(path),
            EventKind::Deleted => self.handle_deleted(path),
        }
    }

    pub fn handle_created(&mut self, path: &Path) -> Outcome {
        let state = match self.observe(path) {
            Ok(state) => state,
            Err(ignored) => return ignored,
        };

        self.states.insert(path.to_path_buf(), state.clone());
        Outcome::Created {
            path: path.to_path_buf(),
            state,
        }
    }

    /// Reporting is gated on modification time only. The stored state,
    /// hash included, is replaced either way.
    pub fn handle_modified(&mut self, path: &Path) -> Outcome {
        let state = match self.observe(path) {
            Ok(state) => state,
            Err(ignored) => return ignored,
        };

        let previous = self.states.insert(path.to_path_buf(), state.clone());
        let path = path.to_path_buf();

        match previous {
            None => Outcome::Baseline { path, state },
            Some(old) if old.modified_time != state.modified_time => Outcome::Modified {
                path,
                old_size: old.size,
                new_size: state.size,
                state,
            },
            Some(_) => Outcome::Unchanged { path, state },
        }
    }

    /// Always reports a deletion, tracked or not.
    pub fn handle_deleted(&mut self, path: &Path) -> Outcome {
        let previous = self.states.remove(path);
        Outcome::Deleted {
            path: path.to_path_buf(),
            previous,
        }
    }

    /// Record the state of every in-scope file under `root` without emitting
    /// outcomes. Returns how many files were recorded.
    pub fn record_baseline(&mut self, root: &Path) -> usize {
        let mut recorded = 0;

        // Standard filters off: the pattern matcher alone decides scope.
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Error walking directory: {}", err);
                    continue;
                }
            };

            // Symlinked files are read through the link, as live events are.
            if entry.file_type().map_or(true, |ft| ft.is_dir()) {
                continue;
            }

            match self.compute_state(entry.path()) {
                Ok(Some(state)) => {
                    self.states.insert(entry.path().to_path_buf(), state);
                    recorded += 1;
                }
                Ok(None) => {}
                Err(err) => warn!("Skipping {} in baseline: {}", entry.path().display(), err),
            }
        }

        recorded
    }

    pub fn get(&self, path: &Path) -> Option<&FileState> {
        self.states.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.states.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn tracked_paths(&self) -> impl Iterator<Item = &Path> {
        self.states.keys().map(PathBuf::as_path)
    }

    /// Compute the state of `path`, or the `Ignored` outcome explaining why not.
    fn observe(&self, path: &Path) -> Result<FileState, Outcome> {
        let reason = match self.compute_state(path) {
            Ok(Some(state)) => return Ok(state),
            Ok(None) if !self.is_in_scope(path) => {
                trace!("Out of scope: {}", path.display());
                IgnoreReason::OutOfScope
            }
            Ok(None) => {
                debug!("No longer on disk: {}", path.display());
                IgnoreReason::Missing
            }
            Err(err) => {
                warn!("Could not read {}: {}", path.display(), err);
                IgnoreReason::Unreadable
            }
        };

        Err(Outcome::Ignored {
            path: path.to_path_buf(),
            reason,
        })
    }
}

impl Default for FileStateTracker {
    fn default() -> Self {
        Self::new(PatternMatcher::default())
    }
}

impl std::fmt::Debug for FileStateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStateTracker")
            .field("matcher", &self.matcher)
            .field("states", &self.states)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn log_tracker() -> FileStateTracker {
        FileStateTracker::new(PatternMatcher::new([r"\.log$"]).unwrap())
    }

    #[test]
    fn test_created_records_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "x").unwrap();

        let mut tracker = log_tracker();
        let outcome = tracker.handle_created(&path);

        assert!(matches!(&outcome, Outcome::Created { state, .. } if state.size == 1));
        assert_eq!(tracker.get(&path).map(|s| s.size), Some(1));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_created_out_of_scope_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "x").unwrap();

        let mut tracker = log_tracker();
        let outcome = tracker.handle_created(&path);

        assert_eq!(
            outcome,
            Outcome::Ignored {
                path: path.clone(),
                reason: IgnoreReason::OutOfScope
            }
        );
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_created_then_vanished_is_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.log");

        let mut tracker = log_tracker();
        let outcome = tracker.handle_created(&path);

        assert!(matches!(
            outcome,
            Outcome::Ignored {
                reason: IgnoreReason::Missing,
                ..
            }
        ));
        assert!(!tracker.contains(&path));
    }

    #[test]
    fn test_modified_without_prior_is_baseline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "abc").unwrap();

        let mut tracker = log_tracker();
        let outcome = tracker.handle_modified(&path);

        assert!(matches!(outcome, Outcome::Baseline { .. }));
        assert_eq!(tracker.get(&path).map(|s| s.size), Some(3));
    }

    #[test]
    fn test_modified_missing_keeps_existing_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "x").unwrap();

        let mut tracker = log_tracker();
        tracker.handle_created(&path);
        fs::remove_file(&path).unwrap();

        let outcome = tracker.handle_modified(&path);
        assert!(matches!(
            outcome,
            Outcome::Ignored {
                reason: IgnoreReason::Missing,
                ..
            }
        ));
        assert!(tracker.contains(&path));
    }

    #[test]
    fn test_deleted_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "x").unwrap();

        let mut tracker = log_tracker();
        tracker.handle_created(&path);

        let first = tracker.handle_deleted(&path);
        assert!(matches!(&first, Outcome::Deleted { previous: Some(_), .. }));

        let second = tracker.handle_deleted(&path);
        assert!(matches!(&second, Outcome::Deleted { previous: None, .. }));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_deleted_reported_for_untracked_and_excluded_paths() {
        let mut tracker = log_tracker();

        let outcome = tracker.handle_deleted(Path::new("/repo/.git/index"));
        assert_eq!(outcome.label(), "deleted");
    }

    #[test]
    fn test_compute_state_excludes_git_even_when_pattern_matches() {
        let dir = TempDir::new().unwrap();
        let git_dir = dir.path().join(".git");
        fs::create_dir(&git_dir).unwrap();
        let path = git_dir.join("config.log");
        fs::write(&path, "[core]").unwrap();

        let tracker = log_tracker();
        assert!(tracker.compute_state(&path).unwrap().is_none());
    }

    #[test]
    fn test_compute_state_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "some content").unwrap();

        let tracker = log_tracker();
        let first = tracker.compute_state(&path).unwrap().unwrap();
        let second = tracker.compute_state(&path).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_handle_dispatches_by_kind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "x").unwrap();

        let mut tracker = log_tracker();
        assert_eq!(tracker.handle(EventKind::Created, &path).label(), "created");
        assert_eq!(tracker.handle(EventKind::Modified, &path).label(), "unchanged");
        assert_eq!(tracker.handle(EventKind::Deleted, &path).label(), "deleted");
    }

    #[test]
    fn test_record_baseline_respects_scope() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("a.log"), "a").unwrap();
        fs::write(dir.path().join("nested/b.log"), "bb").unwrap();
        fs::write(dir.path().join("nested/c.txt"), "ccc").unwrap();

        let mut tracker = log_tracker();
        let recorded = tracker.record_baseline(dir.path());

        assert_eq!(recorded, 2);
        assert!(tracker.contains(&dir.path().join("nested/b.log")));
        assert!(!tracker.contains(&dir.path().join("nested/c.txt")));
    }

    /// Fails for files whose content is `locked`, otherwise reads normally.
    fn read_unless_locked(path: &Path) -> io::Result<Option<FileState>> {
        match fs::read_to_string(path) {
            Ok(content) if content == "locked" => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "locked for reading",
            )),
            _ => FileState::read(path),
        }
    }

    #[test]
    fn test_read_failure_is_ignored_and_keeps_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "x").unwrap();

        let mut tracker = log_tracker().with_reader(read_unless_locked);
        assert_eq!(tracker.handle_created(&path).label(), "created");

        fs::write(&path, "locked").unwrap();
        assert!(tracker.compute_state(&path).is_err());

        let outcome = tracker.handle_modified(&path);
        assert_eq!(
            outcome,
            Outcome::Ignored {
                path: path.clone(),
                reason: IgnoreReason::Unreadable
            }
        );
        assert_eq!(tracker.get(&path).map(|s| s.size), Some(1));

        let outcome = tracker.handle_created(&path);
        assert!(matches!(
            outcome,
            Outcome::Ignored {
                reason: IgnoreReason::Unreadable,
                ..
            }
        ));
        assert_eq!(tracker.get(&path).map(|s| s.size), Some(1));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_unreadable_new_file_is_not_recorded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("b.log");
        fs::write(&path, "locked").unwrap();

        let mut tracker = log_tracker().with_reader(read_unless_locked);
        assert_eq!(tracker.handle_modified(&path).label(), "ignored");
        assert!(tracker.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_record_baseline_follows_symlinked_files() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.log");
        let link = dir.path().join("link.log");
        fs::write(&target, "abc").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let mut tracker = log_tracker();
        assert_eq!(tracker.record_baseline(dir.path()), 2);

        // Same view as a live event on the link
        let live = tracker.compute_state(&link).unwrap();
        assert_eq!(tracker.get(&link), live.as_ref());
        assert_eq!(tracker.get(&link).map(|s| s.size), Some(3));
    }
}
