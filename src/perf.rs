//! Timing scopes and the render debug log.
//!
//! With `--perf`, every [`scope`] prints its duration to stderr when it
//! closes. With `--render-debug-log`, [`log_event`] appends timestamped
//! `sync.*`, `tail.*` and `watcher.*` lines to a file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex};
use std::time::Instant;

static TIMING: AtomicBool = AtomicBool::new(false);
static DEBUG_LOG: LazyLock<Mutex<Option<DebugLog>>> = LazyLock::new(|| Mutex::new(None));

/// Guard returned by [`scope`].
#[derive(Debug)]
#[must_use = "the scope is timed until the guard drops"]
pub struct ScopeTimer {
    name: &'static str,
    started: Option<Instant>,
}

impl Drop for ScopeTimer {
    fn drop(&mut self) {
        if let Some(started) = self.started {
            let ms = started.elapsed().as_secs_f64() * 1000.0;
            eprintln!("[perf] {}: {ms:.2} ms", self.name);
        }
    }
}

/// Time the enclosing block. Free when timing is off.
pub fn scope(name: &'static str) -> ScopeTimer {
    ScopeTimer {
        name,
        started: is_enabled().then(Instant::now),
    }
}

pub fn set_enabled(enabled: bool) {
    TIMING.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    TIMING.load(Ordering::Relaxed)
}

#[derive(Debug)]
struct DebugLog {
    opened: Instant,
    events: u64,
    out: BufWriter<File>,
}

impl DebugLog {
    fn create(path: &Path) -> io::Result<Self> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "tailmark render debug log start")?;
        out.flush()?;
        Ok(Self {
            opened: Instant::now(),
            events: 0,
            out,
        })
    }

    fn record(&mut self, name: &str, detail: &str) -> io::Result<()> {
        self.events += 1;
        let ms = self.opened.elapsed().as_secs_f64() * 1000.0;
        writeln!(self.out, "[{ms:>10.3} ms] {name}: {detail}")?;
        self.out.flush()
    }
}

/// Open the debug log at `path`, replacing any open one. `None` closes it.
///
/// A poisoned log lock leaves logging off.
///
/// # Errors
/// Returns an error if the file cannot be created or its header written.
pub fn set_debug_log_path(path: Option<&Path>) -> io::Result<()> {
    let log = path.map(DebugLog::create).transpose()?;
    if let Ok(mut slot) = DEBUG_LOG.lock() {
        *slot = log;
    }
    Ok(())
}

pub fn is_debug_log_enabled() -> bool {
    DEBUG_LOG.lock().is_ok_and(|slot| slot.is_some())
}

/// Events recorded by the open log; 0 when none is open.
pub fn debug_log_events() -> u64 {
    DEBUG_LOG
        .lock()
        .ok()
        .and_then(|slot| slot.as_ref().map(|log| log.events))
        .unwrap_or(0)
}

pub fn log_event(name: &str, detail: impl AsRef<str>) {
    let Ok(mut slot) = DEBUG_LOG.lock() else {
        return;
    };
    let Some(log) = slot.as_mut() else {
        return;
    };
    if let Err(err) = log.record(name, detail.as_ref()) {
        tracing::warn!("render debug log write failed: {err}");
    }
}
