//! The styled console: text buffer + render synchronization.
//!
//! [`StyledConsole`] is the public face of the engine. Mutations update the
//! [`TextBuffer`] and arm a debounced refresh; the host calls
//! [`StyledConsole::poll`] from its event loop, and due refreshes push only
//! the unsynced delta to the [`RenderSurface`].
//!
//! The console is single-threaded and cheap to clone (an `Rc` handle). No
//! internal borrow is held while the surface runs, so a surface may call
//! back into the console (e.g. pumping pending work that appends) before it
//! returns.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error, warn};

use crate::style::markup::{PageTheme, bootstrap_page};
use crate::style::{LineStyler, StyleRange};
use crate::sync::{
    Clock, MonotonicClock, Next, RenderSurface, RunOutcome, Script, ScriptOp, SurfaceError,
    SyncConfig, SyncScheduler, SyncState,
};
use crate::text::{ModifyEvent, TextBuffer};

/// Handle returned by [`StyledConsole::add_modify_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Result of one refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReport {
    /// A refresh was already running (or the surface was busy); re-armed.
    Deferred,
    /// Nothing to send; the surface was not called.
    UpToDate,
    /// The surface accepted the script.
    Synced { chars: usize, full: bool },
    /// The surface failed; the same delta is retried per `next`.
    Failed { next: Next },
}

type ModifyListener = Rc<dyn Fn(&ModifyEvent)>;

struct Shared {
    buffer: RefCell<TextBuffer>,
    scheduler: RefCell<SyncScheduler>,
    surface: RefCell<Box<dyn RenderSurface>>,
    clock: Box<dyn Clock>,
    modify_listeners: RefCell<Vec<(ListenerId, ModifyListener)>>,
    next_listener_id: Cell<u64>,
    scroll_on_append: Cell<bool>,
    force_scroll: Cell<bool>,
}

/// Builder for [`StyledConsole`].
pub struct ConsoleBuilder {
    config: SyncConfig,
    clock: Option<Box<dyn Clock>>,
    theme: PageTheme,
}

impl ConsoleBuilder {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
            clock: None,
            theme: PageTheme::Dark,
        }
    }

    #[must_use]
    pub const fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    #[must_use]
    pub const fn with_theme(mut self, theme: PageTheme) -> Self {
        self.theme = theme;
        self
    }

    /// Bootstrap `surface` with the initial page and wrap it in a console.
    ///
    /// # Errors
    /// Returns an error if the surface rejects the bootstrap page.
    pub fn build(self, surface: impl RenderSurface + 'static) -> Result<StyledConsole, SurfaceError> {
        let mut surface: Box<dyn RenderSurface> = Box::new(surface);
        surface.bootstrap(&bootstrap_page(self.theme, ""))?;

        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(MonotonicClock::new()));
        Ok(StyledConsole {
            shared: Rc::new(Shared {
                buffer: RefCell::new(TextBuffer::new()),
                scheduler: RefCell::new(SyncScheduler::new(
                    self.config.debounce_ms,
                    self.config.retry,
                )),
                surface: RefCell::new(surface),
                clock,
                modify_listeners: RefCell::new(Vec::new()),
                next_listener_id: Cell::new(0),
                scroll_on_append: Cell::new(self.config.scroll_on_append),
                force_scroll: Cell::new(false),
            }),
        })
    }
}

impl Default for ConsoleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A read-only styled text display kept in sync with a render surface.
#[derive(Clone)]
pub struct StyledConsole {
    shared: Rc<Shared>,
}

/// Non-owning console handle, for surfaces and listeners that call back.
#[derive(Clone)]
pub struct WeakConsole {
    shared: Weak<Shared>,
}

impl WeakConsole {
    pub fn upgrade(&self) -> Option<StyledConsole> {
        self.shared.upgrade().map(|shared| StyledConsole { shared })
    }
}

impl StyledConsole {
    /// Console with default settings and the monotonic clock.
    ///
    /// # Errors
    /// Returns an error if the surface rejects the bootstrap page.
    pub fn new(surface: impl RenderSurface + 'static) -> Result<Self, SurfaceError> {
        ConsoleBuilder::new().build(surface)
    }

    pub fn builder() -> ConsoleBuilder {
        ConsoleBuilder::new()
    }

    pub fn downgrade(&self) -> WeakConsole {
        WeakConsole {
            shared: Rc::downgrade(&self.shared),
        }
    }

    // --- Mutation ---

    /// Replace all content; the next refresh resends everything.
    pub fn set_text(&self, text: &str) {
        let event = self.shared.buffer.borrow_mut().set_text(text);
        self.after_mutation(&event);
    }

    /// Append `text`; the next refresh sends only the new tail.
    pub fn append(&self, text: &str) {
        let event = self.shared.buffer.borrow_mut().append(text);
        if let Some(event) = event {
            self.after_mutation(&event);
        }
    }

    /// Splice `text` over `length` chars at `start`. Forces a full resend.
    pub fn replace_text_range(&self, start: usize, length: usize, text: &str) {
        let event = self
            .shared
            .buffer
            .borrow_mut()
            .replace_text_range(start, length, text);
        if let Some(event) = event {
            self.after_mutation(&event);
        }
    }

    /// Record a decoration. Invalid ranges are dropped and `false` returned.
    ///
    /// Decorations over already synced text show up only after the next
    /// full refresh.
    pub fn set_style_range(&self, range: StyleRange) -> bool {
        let accepted = self.shared.buffer.borrow_mut().set_style_range(range);
        if accepted {
            self.request_refresh();
        }
        accepted
    }

    // --- Queries ---

    pub fn text(&self) -> String {
        self.shared.buffer.borrow().text()
    }

    pub fn char_count(&self) -> usize {
        self.shared.buffer.borrow().char_count()
    }

    pub fn line_count(&self) -> usize {
        self.shared.buffer.borrow().line_count()
    }

    /// Char offset where line `line` starts, or `None` when out of range.
    pub fn offset_at_line(&self, line: usize) -> Option<usize> {
        self.shared.buffer.borrow().offset_at_line(line)
    }

    pub fn line_at(&self, line: usize) -> Option<String> {
        self.shared.buffer.borrow().line_at(line)
    }

    /// Decorations currently recorded, in start order.
    pub fn style_ranges(&self) -> Vec<StyleRange> {
        self.shared.buffer.borrow().styles().iter().cloned().collect()
    }

    // --- Styling policy ---

    /// Install an exclusive line styler, or clear styling with `None`.
    /// Replaces any registered listeners.
    pub fn set_line_styler(&self, styler: Option<Rc<dyn LineStyler>>) {
        self.shared
            .buffer
            .borrow_mut()
            .provider_mut()
            .set_single(styler);
    }

    pub fn line_styler(&self) -> Option<Rc<dyn LineStyler>> {
        self.shared.buffer.borrow().provider().single()
    }

    /// Add a listener whose ranges are merged with the other listeners'.
    /// Replaces an exclusive styler if one is set.
    pub fn add_line_style_listener(&self, listener: Rc<dyn LineStyler>) {
        self.shared
            .buffer
            .borrow_mut()
            .provider_mut()
            .add_listener(listener);
    }

    pub fn remove_line_style_listener(&self, listener: &Rc<dyn LineStyler>) -> bool {
        self.shared
            .buffer
            .borrow_mut()
            .provider_mut()
            .remove_listener(listener)
    }

    // --- Modify notifications ---

    pub fn add_modify_listener(&self, listener: impl Fn(&ModifyEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.shared.next_listener_id.get());
        self.shared.next_listener_id.set(id.0 + 1);
        self.shared
            .modify_listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    pub fn remove_modify_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.shared.modify_listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    // --- Scrolling ---

    pub fn set_scroll_on_append(&self, enabled: bool) {
        self.shared.scroll_on_append.set(enabled);
    }

    pub fn scroll_on_append(&self) -> bool {
        self.shared.scroll_on_append.get()
    }

    /// Scroll the surface to the bottom now, or on the next refresh if a
    /// refresh is in flight or the surface is busy.
    pub fn scroll_to_bottom(&self) {
        if self.shared.scheduler.borrow().is_running() {
            self.defer_scroll();
            return;
        }
        let Ok(mut surface) = self.shared.surface.try_borrow_mut() else {
            self.defer_scroll();
            return;
        };
        let result = surface.execute_script(&Script::scroll_to_bottom());
        drop(surface);
        if let Err(err) = result {
            warn!(%err, "scroll to bottom failed; deferring to next refresh");
            self.defer_scroll();
        }
    }

    // --- Synchronization ---

    /// Arm a refresh if none is pending.
    pub fn request_refresh(&self) {
        let now = self.shared.clock.now_ms();
        self.shared.scheduler.borrow_mut().request(now);
    }

    /// Run the refresh if its deadline has passed.
    pub fn poll(&self) -> Option<SyncReport> {
        let now = self.shared.clock.now_ms();
        let due = self.shared.scheduler.borrow().is_due(now);
        due.then(|| self.refresh())
    }

    /// Deadline of the armed refresh on the console's clock.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.shared.scheduler.borrow().due_ms()
    }

    /// Current time on the console's clock.
    pub fn now_ms(&self) -> u64 {
        self.shared.clock.now_ms()
    }

    pub fn sync_state(&self) -> SyncState {
        self.shared.scheduler.borrow().state()
    }

    pub fn write_position(&self) -> usize {
        self.shared.buffer.borrow().write_position()
    }

    pub fn needs_full_refresh(&self) -> bool {
        self.shared.buffer.borrow().needs_full_refresh()
    }

    /// Whether the surface shows all content and has no scroll owed.
    pub fn is_synced(&self) -> bool {
        !self.shared.buffer.borrow().has_unsynced() && !self.shared.force_scroll.get()
    }

    /// Push the unsynced delta to the surface now.
    ///
    /// A call made while a refresh is already running only re-arms it. The
    /// content length is snapshotted before the surface runs; text appended
    /// during the call stays unsynced and goes out with the next refresh. On
    /// failure nothing is marked synced and the identical delta is retried.
    pub fn refresh(&self) -> SyncReport {
        let shared = &self.shared;
        if shared.scheduler.borrow_mut().begin().is_err() {
            return SyncReport::Deferred;
        }

        let mut pending = shared.buffer.borrow().pending_sync();
        let scroll =
            shared.force_scroll.get() || (pending.is_some() && shared.scroll_on_append.get());

        let mut script = Script::new();
        if let Some(pending) = pending.as_mut() {
            let html = std::mem::take(&mut pending.html);
            script.push(if pending.full {
                ScriptOp::Replace(html)
            } else {
                ScriptOp::Append(html)
            });
        }
        if scroll {
            script.push(ScriptOp::ScrollToBottom);
        }

        if script.is_empty() {
            let now = shared.clock.now_ms();
            shared.scheduler.borrow_mut().finish(now, RunOutcome::Nothing);
            return SyncReport::UpToDate;
        }

        let Ok(mut surface) = shared.surface.try_borrow_mut() else {
            let now = shared.clock.now_ms();
            shared.scheduler.borrow_mut().defer(now);
            debug!("surface busy; refresh deferred");
            return SyncReport::Deferred;
        };
        let result = {
            let _scope = crate::perf::scope("sync.execute_script");
            surface.execute_script(&script)
        };
        drop(surface);

        let now = shared.clock.now_ms();
        match result {
            Ok(()) => {
                let (chars, full) = pending.as_ref().map_or((0, false), |sent| {
                    if !shared.buffer.borrow_mut().mark_synced(sent) {
                        debug!("buffer reset during refresh; full refresh still pending");
                    }
                    (sent.to - sent.from, sent.full)
                });
                if scroll {
                    shared.force_scroll.set(false);
                }
                let next = shared.scheduler.borrow_mut().finish(now, RunOutcome::Synced);
                crate::perf::log_event(
                    "sync.ok",
                    format!("chars={chars} full={full} scroll={scroll} next={next:?}"),
                );
                SyncReport::Synced { chars, full }
            }
            Err(err) => {
                let next = shared.scheduler.borrow_mut().finish(now, RunOutcome::Failed);
                match next {
                    Next::GaveUp { attempts } => {
                        error!(%err, attempts, "render sync failed; retry budget spent");
                    }
                    _ => warn!(%err, ?next, "render sync failed; will retry"),
                }
                crate::perf::log_event("sync.failed", format!("err={err} next={next:?}"));
                SyncReport::Failed { next }
            }
        }
    }

    // --- Private helpers ---

    fn after_mutation(&self, event: &ModifyEvent) {
        self.request_refresh();
        let listeners: Vec<ModifyListener> = self
            .shared
            .modify_listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    fn defer_scroll(&self) {
        self.shared.force_scroll.set(true);
        self.request_refresh();
    }
}

impl fmt::Debug for StyledConsole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyledConsole")
            .field("buffer", &self.shared.buffer)
            .field("state", &self.shared.scheduler.borrow().state())
            .field("scroll_on_append", &self.shared.scroll_on_append.get())
            .field("force_scroll", &self.shared.force_scroll.get())
            .finish_non_exhaustive()
    }
}
