// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. style::StyleRange)
    clippy::module_name_repetitions
)]

//! # Tailmark
//!
//! Incremental styled-text synchronization for live log consoles.
//!
//! A [`console::StyledConsole`] owns a growing text buffer with styled
//! ranges and mirrors it into a passive render surface (an HTML page, a
//! webview) by sending only what changed since the last successful sync:
//! - Appends go out as an incremental markup delta
//! - Edits before the synced point force one full resend
//! - Bursts of mutations coalesce into one debounced refresh
//! - Failed refreshes are retried with the identical delta
//!
//! ## Architecture
//!
//! - **Buffer**: rope text, line index, style store, write position
//! - **Styling**: per-line stylers (regex rules, syntax highlighting)
//! - **Sync**: debounce/retry state machine driven by an injectable clock
//! - **Surface**: anything that can take a bootstrap page and run scripts
//!
//! ## Modules
//!
//! - [`console`]: The public engine handle
//! - [`text`]: Text buffer and line index
//! - [`style`]: Style ranges, markup generation, line stylers
//! - [`sync`]: Scheduler, clocks, scripts and render surfaces
//! - [`highlight`]: Syntax highlighting styler
//! - [`app`]: File-tailing host loop
//! - [`watcher`]: File watching
//! - [`config`]: Flag files and sync tuning

pub mod app;
pub mod config;
pub mod console;
pub mod highlight;
pub mod perf;
pub mod style;
pub mod sync;
pub mod text;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::console::{StyledConsole, SyncReport};
    pub use crate::style::{LineStyleEvent, LineStyler, Rgb, StyleRange, styler_fn};
    pub use crate::sync::{HtmlFileSurface, RenderSurface, Script, SurfaceError, SyncConfig};
}
