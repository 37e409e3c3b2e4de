//! End-to-end synchronization scenarios against a recording surface.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use tailmark::console::{StyledConsole, SyncReport};
use tailmark::style::{Rgb, StyleRange, styler_fn};
use tailmark::sync::{
    ManualClock, Next, RenderSurface, RetryPolicy, Script, ScriptOp, SurfaceError, SyncConfig,
    SyncState,
};

type Hook = Box<dyn FnOnce()>;

/// Shared view of everything a surface was asked to do.
#[derive(Clone, Default)]
struct Recorder {
    bootstrap: Rc<RefCell<String>>,
    attempts: Rc<RefCell<Vec<Script>>>,
    applied: Rc<RefCell<Vec<Script>>>,
    failures: Rc<Cell<u32>>,
    hook: Rc<RefCell<Option<Hook>>>,
}

impl Recorder {
    fn applied_markup(&self) -> String {
        self.applied.borrow().iter().map(Script::markup).collect()
    }

    fn calls(&self) -> usize {
        self.attempts.borrow().len()
    }
}

struct RecordingSurface(Recorder);

impl RenderSurface for RecordingSurface {
    fn bootstrap(&mut self, html: &str) -> Result<(), SurfaceError> {
        *self.0.bootstrap.borrow_mut() = html.to_string();
        Ok(())
    }

    fn execute_script(&mut self, script: &Script) -> Result<(), SurfaceError> {
        self.0.attempts.borrow_mut().push(script.clone());
        let hook = self.0.hook.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
        if self.0.failures.get() > 0 {
            self.0.failures.set(self.0.failures.get() - 1);
            return Err(SurfaceError::Unavailable("page not ready".into()));
        }
        self.0.applied.borrow_mut().push(script.clone());
        Ok(())
    }
}

fn setup(retry: RetryPolicy) -> (StyledConsole, Recorder, ManualClock) {
    let recorder = Recorder::default();
    let clock = ManualClock::new();
    let console = StyledConsole::builder()
        .with_clock(clock.clone())
        .with_config(SyncConfig {
            debounce_ms: 100,
            retry,
            scroll_on_append: false,
        })
        .build(RecordingSurface(recorder.clone()))
        .unwrap();
    (console, recorder, clock)
}

fn console() -> (StyledConsole, Recorder, ManualClock) {
    setup(RetryPolicy::default())
}

// --- bootstrap ---

#[test]
fn test_bootstrap_page_defines_script_helpers() {
    let (_console, recorder, _clock) = console();
    let page = recorder.bootstrap.borrow();
    assert!(page.contains("tailmark-content"));
    assert!(page.contains("scrollToBottom"));
}

// --- ordering and coalescing ---

#[test]
fn test_appends_are_delivered_in_order() {
    let (console, recorder, clock) = console();
    console.append("first\n");
    clock.advance(100);
    console.poll();
    console.append("second\n");
    console.append("third\n");
    clock.advance(100);
    console.poll();

    assert_eq!(console.text(), "first\nsecond\nthird\n");
    assert_eq!(recorder.applied_markup(), "first\nsecond\nthird\n");
    assert_eq!(recorder.calls(), 2);
}

#[test]
fn test_refresh_twice_without_mutation_calls_surface_once() {
    let (console, recorder, _clock) = console();
    console.append("x");
    console.refresh();
    assert_eq!(console.refresh(), SyncReport::UpToDate);
    assert_eq!(recorder.calls(), 1);
}

#[test]
fn test_poll_before_deadline_does_nothing() {
    let (console, recorder, clock) = console();
    console.append("x");
    clock.advance(99);
    assert_eq!(console.poll(), None);
    assert_eq!(recorder.calls(), 0);
    clock.advance(1);
    assert!(console.poll().is_some());
}

// --- re-entrancy ---

#[test]
fn test_append_during_surface_call_goes_out_next_cycle() {
    let (console, recorder, clock) = console();
    let weak = console.downgrade();
    *recorder.hook.borrow_mut() = Some(Box::new(move || {
        weak.upgrade().unwrap().append("late\n");
    }));

    console.append("early\n");
    clock.advance(100);
    assert_eq!(
        console.poll(),
        Some(SyncReport::Synced {
            chars: 6,
            full: false
        })
    );
    assert_eq!(console.write_position(), 6);
    assert!(matches!(console.sync_state(), SyncState::Pending { .. }));

    clock.advance(100);
    console.poll();
    assert_eq!(recorder.applied.borrow()[1].ops(), &[ScriptOp::Append("late\n".into())]);
    assert!(console.is_synced());
}

#[test]
fn test_set_text_during_surface_call_forces_full_resend() {
    let (console, recorder, clock) = console();
    let weak = console.downgrade();
    *recorder.hook.borrow_mut() = Some(Box::new(move || {
        weak.upgrade().unwrap().set_text("reset");
    }));

    console.append("before");
    console.refresh();
    assert!(console.needs_full_refresh());
    assert_eq!(console.write_position(), 0);

    clock.advance(100);
    console.poll();
    assert_eq!(recorder.applied.borrow()[1].ops(), &[ScriptOp::Replace("reset".into())]);
}

#[test]
fn test_refresh_inside_surface_call_is_deferred() {
    let (console, recorder, _clock) = console();
    let inner = Rc::new(Cell::new(None));
    let seen = Rc::clone(&inner);
    let weak = console.downgrade();
    *recorder.hook.borrow_mut() = Some(Box::new(move || {
        seen.set(Some(weak.upgrade().unwrap().refresh()));
    }));

    console.append("x");
    let outer = console.refresh();
    assert_eq!(
        outer,
        SyncReport::Synced {
            chars: 1,
            full: false
        }
    );
    assert_eq!(inner.get(), Some(SyncReport::Deferred));
    assert_eq!(recorder.calls(), 1);
    assert!(matches!(console.sync_state(), SyncState::Pending { .. }));
}

#[test]
fn test_refresh_while_scrolling_is_deferred() {
    let (console, recorder, clock) = console();
    let inner = Rc::new(Cell::new(None));
    let seen = Rc::clone(&inner);
    let weak = console.downgrade();
    *recorder.hook.borrow_mut() = Some(Box::new(move || {
        seen.set(Some(weak.upgrade().unwrap().refresh()));
    }));

    console.append("x");
    console.scroll_to_bottom();
    assert_eq!(inner.get(), Some(SyncReport::Deferred));
    assert_eq!(recorder.calls(), 1);
    assert_eq!(recorder.attempts.borrow()[0], Script::scroll_to_bottom());
    assert!(matches!(console.sync_state(), SyncState::Pending { .. }));
    assert_eq!(console.write_position(), 0);

    clock.advance(100);
    console.poll();
    assert_eq!(recorder.applied_markup(), "x");
    assert!(console.is_synced());
}

// --- failure and retry ---

#[test]
fn test_failure_keeps_write_position_and_resends_identical_delta() {
    let (console, recorder, clock) = console();
    recorder.failures.set(1);
    console.append("payload <1>\n");
    clock.advance(100);

    let report = console.poll();
    assert!(matches!(
        report,
        Some(SyncReport::Failed {
            next: Next::Retry { attempt: 1, .. }
        })
    ));
    assert_eq!(console.write_position(), 0);

    clock.advance(100);
    console.poll();
    let attempts = recorder.attempts.borrow();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0], attempts[1]);
    assert_eq!(attempts[1].markup(), "payload &lt;1&gt;\n");
    assert!(console.is_synced());
}

#[test]
fn test_bounded_retry_gives_up_and_resumes_on_next_mutation() {
    let (console, recorder, clock) = setup(RetryPolicy {
        max_attempts: Some(2),
        ..RetryPolicy::fixed(50)
    });
    recorder.failures.set(2);
    console.append("a");
    clock.advance(100);
    console.poll();
    clock.advance(50);
    let report = console.poll();
    assert_eq!(
        report,
        Some(SyncReport::Failed {
            next: Next::GaveUp { attempts: 2 }
        })
    );
    assert_eq!(console.sync_state(), SyncState::Idle);
    assert!(!console.is_synced());

    console.append("b");
    clock.advance(100);
    console.poll();
    assert_eq!(recorder.applied_markup(), "ab");
}

#[test]
fn test_backoff_stretches_retry_deadline() {
    let (console, recorder, clock) = setup(RetryPolicy {
        period_ms: 10,
        backoff: 2.0,
        max_period_ms: 30,
        max_attempts: None,
    });
    recorder.failures.set(3);
    console.append("x");
    clock.advance(100);
    console.poll();
    assert_eq!(console.next_deadline_ms(), Some(110));
    clock.set(110);
    console.poll();
    assert_eq!(console.next_deadline_ms(), Some(130));
    clock.set(130);
    console.poll();
    assert_eq!(console.next_deadline_ms(), Some(160));
}

// --- text model ---

#[test]
fn test_line_index_queries() {
    let (console, _recorder, _clock) = console();
    console.set_text("a\nb\nc");
    assert_eq!(console.line_count(), 3);
    assert_eq!(console.offset_at_line(1), Some(2));
    assert_eq!(console.offset_at_line(3), None);
}

#[test]
fn test_replace_before_write_position_resends_everything() {
    let (console, recorder, _clock) = console();
    console.set_text("abcdef");
    assert!(console.set_style_range(StyleRange::new(4, 1).bold()));
    console.refresh();

    console.replace_text_range(2, 2, "XY");
    assert_eq!(console.text(), "abXYef");
    assert!(console.needs_full_refresh());
    assert!(console.style_ranges().is_empty());

    console.refresh();
    assert_eq!(
        recorder.applied.borrow().last().unwrap().ops(),
        &[ScriptOp::Replace("abXYef".into())]
    );
}

// --- styling ---

#[test]
fn test_bold_middle_char() {
    let (console, recorder, _clock) = console();
    console.set_text("abc");
    console.set_style_range(StyleRange::new(1, 1).bold());
    console.refresh();
    assert_eq!(
        recorder.applied_markup(),
        r#"a<span style="font-weight:bold">b</span>c"#
    );
}

#[test]
fn test_error_line_synced_as_red_span() {
    let (console, recorder, _clock) = console();
    console.set_line_styler(Some(styler_fn(|event| {
        if event.line_text.starts_with("ERROR") {
            vec![StyleRange::new(0, event.line_text.chars().count()).fg(Rgb::RED)]
        } else {
            Vec::new()
        }
    })));

    console.append("ERROR: disk full\n");
    console.refresh();
    assert_eq!(
        recorder.applied_markup(),
        "<span style=\"color:#cd3131\">ERROR: disk full</span>\n"
    );
}

#[test]
fn test_range_straddling_write_position_resumes_at_window() {
    let (console, recorder, _clock) = console();
    console.append("ab");
    console.refresh();
    console.append("cd");
    console.set_style_range(StyleRange::new(1, 3).underline());
    console.refresh();

    let applied = recorder.applied.borrow();
    assert_eq!(
        applied[1].markup(),
        r#"<span style="text-decoration:underline">cd</span>"#
    );
}

#[test]
fn test_listeners_merge_ranges_per_line() {
    let (console, recorder, _clock) = console();
    console.add_line_style_listener(styler_fn(|_| vec![StyleRange::new(0, 1).bold()]));
    console.add_line_style_listener(styler_fn(|event| {
        let len = event.line_text.chars().count();
        vec![StyleRange::new(len - 1, 1).fg(Rgb::BLUE)]
    }));

    console.append("xyz\n");
    console.refresh();
    assert_eq!(
        recorder.applied_markup(),
        "<span style=\"font-weight:bold\">x</span>y<span style=\"color:#2472c8\">z</span>\n"
    );
}

proptest! {
    #[test]
    fn prop_appends_concatenate(chunks in proptest::collection::vec("[a-z\\n]{0,12}", 0..12)) {
        let (console, recorder, clock) = console();
        for (i, chunk) in chunks.iter().enumerate() {
            console.append(chunk);
            if i % 3 == 0 {
                clock.advance(100);
                console.poll();
            }
        }
        console.refresh();
        let expected: String = chunks.concat();
        prop_assert_eq!(console.text(), expected.clone());
        prop_assert_eq!(recorder.applied_markup(), expected);
    }
}
