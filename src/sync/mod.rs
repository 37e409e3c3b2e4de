//! Render synchronization: scheduling, scripts and surfaces.

mod clock;
mod scheduler;
mod script;
pub mod surface;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use scheduler::{
    AlreadyRunning, DEFAULT_DEBOUNCE_MS, Next, RetryPolicy, RunOutcome, SyncScheduler, SyncState,
};
pub use script::{Script, ScriptOp};
pub use surface::{HtmlFileSurface, RenderSurface, ScriptStreamSurface, SurfaceError};

/// Tuning for a [`crate::console::StyledConsole`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncConfig {
    /// Delay between the first unsynced mutation and the refresh.
    pub debounce_ms: u64,
    pub retry: RetryPolicy,
    /// Scroll the surface to the bottom after every content sync.
    pub scroll_on_append: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            retry: RetryPolicy::default(),
            scroll_on_append: true,
        }
    }
}
