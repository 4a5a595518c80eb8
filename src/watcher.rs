use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

use crate::config::{WatchMode, WatcherConfig};
use crate::core::{AppEvent, EventKind, FileEvent, FileStateTracker, PatternMatcher};
use crate::error::{Result, WatchError};

/// Everything needed to start a [`WatchSession`].
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub root: PathBuf,
    pub patterns: Vec<String>,
    pub mode: WatchMode,
    pub poll_interval: Duration,
    pub baseline: bool,
}

impl WatchOptions {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let defaults = WatcherConfig::default();
        Self::from_config(root, &defaults)
    }

    pub fn from_config<P: AsRef<Path>>(root: P, config: &WatcherConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            patterns: config.patterns.clone(),
            mode: config.mode,
            poll_interval: config.poll_interval(),
            baseline: config.baseline,
        }
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_mode(mut self, mode: WatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_baseline(mut self, baseline: bool) -> Self {
        self.baseline = baseline;
        self
    }
}

enum Message {
    Notify(notify::Result<Event>),
    Shutdown,
}

/// Backend handle; dropping it releases the OS watches.
enum Backend {
    Native(RecommendedWatcher),
    Polling(PollWatcher),
}

impl Backend {
    /// Start the backend `options.mode` asks for. `Auto` tries native events
    /// first and falls back to polling when they are unavailable.
    fn start(options: &WatchOptions, tx: Sender<Message>) -> Result<Self> {
        match options.mode {
            WatchMode::Native => Self::native(options, tx),
            WatchMode::Polling => Self::polling(options, tx),
            WatchMode::Auto => Self::native(options, tx.clone()).or_else(|err| {
                warn!("Native file events unavailable ({}), falling back to polling", err);
                Self::polling(options, tx)
            }),
        }
    }

    fn native(options: &WatchOptions, tx: Sender<Message>) -> Result<Self> {
        let mut watcher = RecommendedWatcher::new(forward_to(tx), Config::default())?;
        watcher.watch(&options.root, RecursiveMode::Recursive)?;
        Ok(Backend::Native(watcher))
    }

    fn polling(options: &WatchOptions, tx: Sender<Message>) -> Result<Self> {
        let config = Config::default().with_poll_interval(options.poll_interval);
        let mut watcher = PollWatcher::new(forward_to(tx), config)?;
        watcher.watch(&options.root, RecursiveMode::Recursive)?;
        Ok(Backend::Polling(watcher))
    }

    fn mode(&self) -> WatchMode {
        match self {
            Backend::Native(_) => WatchMode::Native,
            Backend::Polling(_) => WatchMode::Polling,
        }
    }
}

fn forward_to(tx: Sender<Message>) -> impl FnMut(notify::Result<Event>) + Send + 'static {
    move |res| {
        let _ = tx.send(Message::Notify(res));
    }
}

/// A running watch on one directory tree.
///
/// A single worker thread owns the [`FileStateTracker`] and classifies events
/// in delivery order; outcomes arrive through [`WatchSession::recv`] and
/// friends.
pub struct WatchSession {
    root: PathBuf,
    mode: WatchMode,
    backend: Option<Backend>,
    control_tx: Sender<Message>,
    worker: Option<JoinHandle<FileStateTracker>>,
    event_rx: Receiver<AppEvent>,
}

impl WatchSession {
    pub fn start(options: WatchOptions) -> Result<Self> {
        let root = options.root.clone();
        if !root.exists() {
            return Err(WatchError::RootNotFound(root));
        }
        if !root.is_dir() {
            return Err(WatchError::NotADirectory(root));
        }

        let matcher = PatternMatcher::new(options.patterns.iter().cloned())?;
        let mut tracker = FileStateTracker::new(matcher);

        if options.baseline {
            let recorded = tracker.record_baseline(&root);
            info!("Recorded baseline for {} files", recorded);
        }

        let (tx, rx) = mpsc::channel::<Message>();
        let (event_tx, event_rx) = mpsc::channel::<AppEvent>();

        let backend = Backend::start(&options, tx.clone())?;
        let mode = backend.mode();

        let worker = thread::Builder::new()
            .name("watchstate-events".to_string())
            .spawn(move || run_worker(tracker, rx, event_tx))?;

        info!("Starting to watch the directory: {} ({:?})", root.display(), mode);

        Ok(Self {
            root,
            mode,
            backend: Some(backend),
            control_tx: tx,
            worker: Some(worker),
            event_rx,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Backend actually in use; never `Auto`.
    pub fn mode(&self) -> WatchMode {
        self.mode
    }

    pub fn try_recv(&self) -> Result<AppEvent, TryRecvError> {
        self.event_rx.try_recv()
    }

    pub fn recv(&self) -> Result<AppEvent, RecvError> {
        self.event_rx.recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.event_rx.recv_timeout(timeout)
    }

    /// Release the watch handles, drain the worker and return its tracker.
    pub fn stop(mut self) -> Result<FileStateTracker> {
        let tracker = self.shutdown()?;
        tracker.ok_or(WatchError::WorkerPanicked)
    }

    fn shutdown(&mut self) -> Result<Option<FileStateTracker>> {
        // Dropping the backend unregisters every OS watch before the worker exits.
        self.backend.take();

        let Some(worker) = self.worker.take() else {
            return Ok(None);
        };

        let _ = self.control_tx.send(Message::Shutdown);
        let tracker = worker.join().map_err(|_| WatchError::WorkerPanicked)?;
        info!("Stopped watching directory");
        Ok(Some(tracker))
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!("Failed to stop watch session: {}", err);
        }
    }
}

fn run_worker(
    mut tracker: FileStateTracker,
    rx: Receiver<Message>,
    event_tx: Sender<AppEvent>,
) -> FileStateTracker {
    while let Ok(message) = rx.recv() {
        let event = match message {
            Message::Shutdown => break,
            Message::Notify(Ok(event)) => event,
            Message::Notify(Err(err)) => {
                error!("File watcher error: {}", err);
                if event_tx.send(AppEvent::WatchFailed(err.to_string())).is_err() {
                    break;
                }
                continue;
            }
        };

        for (kind, path) in classify(&event) {
            let outcome = tracker.handle(kind, &path);
            debug!("{} -> {}", path.display(), outcome.label());
            if event_tx.send(AppEvent::FileChanged(FileEvent::new(outcome))).is_err() {
                // Receiver dropped; keep the tracker consistent until shutdown.
                continue;
            }
        }
    }

    tracker
}

/// Map a notify event to the raw `(kind, path)` pairs the tracker consumes.
///
/// Directory events are dropped. A rename becomes a delete of the old path
/// and a create of the new one, each reported once.
pub fn classify(event: &Event) -> Vec<(EventKind, PathBuf)> {
    use notify::EventKind as Kind;

    let paths = &event.paths;
    let each = |kind: EventKind| -> Vec<(EventKind, PathBuf)> {
        paths.iter().map(|p| (kind, p.clone())).collect()
    };

    match &event.kind {
        Kind::Create(CreateKind::Folder) | Kind::Remove(RemoveKind::Folder) => Vec::new(),
        Kind::Create(_) => each(EventKind::Created)
            .into_iter()
            .filter(|(_, p)| !p.is_dir())
            .collect(),
        Kind::Modify(ModifyKind::Name(RenameMode::From)) => each(EventKind::Deleted),
        Kind::Modify(ModifyKind::Name(RenameMode::To)) => each(EventKind::Created)
            .into_iter()
            .filter(|(_, p)| !p.is_dir())
            .collect(),
        // Backends that report `Both` have already sent `From` and `To`.
        Kind::Modify(ModifyKind::Name(RenameMode::Both)) => Vec::new(),
        // FSEvents reports either side of a rename as `Any`; existence tells which.
        Kind::Modify(ModifyKind::Name(RenameMode::Any | RenameMode::Other)) => paths
            .iter()
            .filter(|p| !p.is_dir())
            .map(|p| {
                let kind = if p.exists() {
                    EventKind::Created
                } else {
                    EventKind::Deleted
                };
                (kind, p.clone())
            })
            .collect(),
        Kind::Modify(_) => each(EventKind::Modified)
            .into_iter()
            .filter(|(_, p)| !p.is_dir())
            .collect(),
        Kind::Remove(_) => each(EventKind::Deleted),
        Kind::Access(_) | Kind::Any | Kind::Other => Vec::new(),
    }
}
