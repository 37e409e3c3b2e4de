//! Following a log file on disk.
//!
//! Uses the notify crate for cross-platform file system events. Events are
//! coalesced over a debounce window and reported as a single [`FileChange`].
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// What happened to the watched file since the last report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    /// Written in place; usually new bytes at the end.
    Modified,
    /// Created, removed or renamed; the content must be read from scratch.
    Replaced,
}

impl FileChange {
    fn merge(self, other: Self) -> Self {
        if self == Self::Replaced || other == Self::Replaced {
            Self::Replaced
        } else {
            Self::Modified
        }
    }
}

/// Watches a single file and emits debounced change notifications.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watch_root: PathBuf,
    target_path: PathBuf,
    target_name: Option<OsString>,
    debounce: Duration,
    pending: Option<(Instant, FileChange)>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("target_path", &self.target_path)
            .field("debounce", &self.debounce)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Create a watcher for `path`.
    ///
    /// The parent directory is watched so rotation (rename + create) is seen.
    ///
    /// # Errors
    /// Returns an error if the file watcher cannot be created or the path cannot be watched.
    pub fn new(path: impl AsRef<Path>, debounce: Duration) -> notify::Result<Self> {
        // Event paths from the OS are absolute and canonical.
        let target_path = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let target_name = target_path.file_name().map(std::ffi::OsStr::to_os_string);
        let watch_root = watch_root_for(&target_path);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;
        tracing::debug!(path = %target_path.display(), "watching file");

        Ok(Self {
            _watcher: watcher,
            rx,
            watch_root,
            target_path,
            target_name,
            debounce,
            pending: None,
        })
    }

    /// The canonical path of the file being watched.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub const fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Drain OS events; returns a change once it has been quiet for the
    /// debounce window.
    pub fn take_change(&mut self) -> Option<FileChange> {
        let mut seen = None::<FileChange>;
        let mut total_events = 0u32;
        let mut irrelevant_events = 0u32;
        while let Ok(event) = self.rx.try_recv() {
            total_events += 1;
            match event {
                Ok(ev) if self.is_relevant(&ev) => {
                    let change = classify(&ev.kind);
                    seen = Some(seen.map_or(change, |prev| prev.merge(change)));
                }
                Ok(ev) => {
                    irrelevant_events += 1;
                    crate::perf::log_event(
                        "watcher.irrelevant",
                        format!("kind={:?} paths={:?}", ev.kind, ev.paths),
                    );
                }
                Err(err) => {
                    tracing::warn!("file watcher error: {err}");
                    crate::perf::log_event("watcher.error", format!("{err}"));
                }
            }
        }

        if total_events > 0 {
            crate::perf::log_event(
                "watcher.poll",
                format!(
                    "total={total_events} relevant={seen:?} irrelevant={irrelevant_events} target={}",
                    self.target_path.display(),
                ),
            );
        }

        if let Some(change) = seen {
            let merged = self
                .pending
                .map_or(change, |(_, pending)| pending.merge(change));
            self.pending = Some((Instant::now(), merged));
        }

        let (since, change) = self.pending?;
        if since.elapsed() >= self.debounce {
            self.pending = None;
            return Some(change);
        }
        None
    }

    fn is_relevant(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            path == &self.watch_root
                || path == &self.target_path
                || self
                    .target_name
                    .as_ref()
                    .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

fn classify(kind: &EventKind) -> FileChange {
    match kind {
        EventKind::Create(_)
        | EventKind::Remove(_)
        | EventKind::Modify(notify::event::ModifyKind::Name(_)) => FileChange::Replaced,
        _ => FileChange::Modified,
    }
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
