use std::time::Duration;

use anyhow::{Context, Result};

use crate::app::{App, LogTail, TailUpdate};
use crate::console::{StyledConsole, SyncReport};
use crate::sync::Next;
use crate::watcher::{FileChange, FileWatcher};

/// Counters for one [`App::run`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub syncs: u64,
    pub failures: u64,
    pub appends: u64,
    pub resets: u64,
}

impl App {
    /// Load the file into `console` and keep the surface in sync.
    ///
    /// Without watching, returns once everything is on the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read initially, the watcher
    /// cannot be started, or (without watching) the surface fails past the
    /// retry budget.
    pub fn run(&mut self, console: &StyledConsole) -> Result<RunSummary> {
        let _run_scope = crate::perf::scope("app.run.total");
        let mut summary = RunSummary::default();

        let mut tail = LogTail::new(&self.file_path);
        let initial = tail
            .read_all()
            .with_context(|| format!("Failed to read {}", self.file_path.display()))?;
        console.set_text(&initial);
        summary.resets += 1;

        let mut watcher = if self.watch_enabled {
            Some(
                FileWatcher::new(&self.file_path, self.watch_debounce).with_context(|| {
                    format!("Failed to watch {}", self.file_path.display())
                })?,
            )
        } else {
            None
        };

        loop {
            summary.cycles += 1;

            if let Some(change) = watcher.as_mut().and_then(FileWatcher::take_change) {
                apply_change(console, &mut tail, change, &mut summary);
            }

            if let Some(report) = console.poll() {
                match report {
                    SyncReport::Synced { .. } => summary.syncs += 1,
                    SyncReport::Failed { next } => {
                        summary.failures += 1;
                        if let Next::GaveUp { attempts } = next {
                            if watcher.is_none() {
                                anyhow::bail!(
                                    "render surface failed {attempts} times; giving up"
                                );
                            }
                        }
                    }
                    SyncReport::Deferred | SyncReport::UpToDate => {}
                }
            }

            if watcher.is_none() && console.is_synced() {
                break;
            }
            if self.max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }
            std::thread::sleep(self.sleep_duration(console));
        }

        crate::perf::log_event("app.run.done", format!("{summary:?}"));
        Ok(summary)
    }

    /// Time until the console's refresh is due, capped by the poll interval.
    pub(super) fn sleep_duration(&self, console: &StyledConsole) -> Duration {
        console.next_deadline_ms().map_or(self.poll_interval, |due| {
            let wait = Duration::from_millis(due.saturating_sub(console.now_ms()));
            wait.min(self.poll_interval)
        })
    }
}

/// Pull the file's new state into the console.
///
/// Read errors are logged and skipped; a rotated file may be briefly absent.
pub(super) fn apply_change(
    console: &StyledConsole,
    tail: &mut LogTail,
    change: FileChange,
    summary: &mut RunSummary,
) {
    let update = match change {
        FileChange::Modified => tail.read_update(),
        FileChange::Replaced => tail.read_all().map(TailUpdate::Reset),
    };
    match update {
        Ok(TailUpdate::Unchanged) => {}
        Ok(TailUpdate::Append(text)) => {
            console.append(&text);
            summary.appends += 1;
        }
        Ok(TailUpdate::Reset(text)) => {
            console.set_text(&text);
            summary.resets += 1;
        }
        Err(err) => {
            tracing::warn!(path = %tail.path().display(), "failed to read file: {err}");
            crate::perf::log_event("tail.error", format!("{err}"));
        }
    }
}
