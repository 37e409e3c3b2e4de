//! The log-tail host.
//!
//! [`App`] feeds a file into a [`crate::console::StyledConsole`]: the initial
//! content with `set_text`, later growth with `append`, and a truncated or
//! replaced file with `set_text` again. It drives the console's refresh
//! deadline with plain sleeps, the way a GUI host would with its timer.

mod event_loop;
mod tail;

pub use event_loop::RunSummary;
pub use tail::{LogTail, TailUpdate};

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default debounce for file system events.
pub const DEFAULT_WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Longest the loop sleeps between checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Main application struct that owns the tail and runs the event loop.
#[derive(Debug)]
pub struct App {
    file_path: PathBuf,
    watch_enabled: bool,
    watch_debounce: Duration,
    poll_interval: Duration,
    max_cycles: Option<u64>,
}

impl App {
    /// Create a new application for the given file.
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            watch_enabled: false,
            watch_debounce: DEFAULT_WATCH_DEBOUNCE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_cycles: None,
        }
    }

    /// Keep following the file after the initial content is synced.
    #[must_use]
    pub const fn with_watch(mut self, enabled: bool) -> Self {
        self.watch_enabled = enabled;
        self
    }

    #[must_use]
    pub const fn with_watch_debounce(mut self, debounce: Duration) -> Self {
        self.watch_debounce = debounce;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Stop after this many loop iterations even if watching.
    #[must_use]
    pub const fn with_max_cycles(mut self, cycles: Option<u64>) -> Self {
        self.max_cycles = cycles;
        self
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}
