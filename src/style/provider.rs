//! Pluggable per-line styling policy.

use std::fmt;
use std::rc::Rc;

use super::StyleRange;

/// One completed line handed to a styler.
///
/// `line_text` excludes the line break and any carriage returns. Ranges are
/// computed against `line_text` and mapped back past the dropped `\r`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStyleEvent<'a> {
    /// Absolute char offset of the line's first character.
    pub line_offset: usize,
    pub line_text: &'a str,
}

/// Computes decorations for a single line.
///
/// Returned ranges are relative to the start of the line. Stylers run while
/// the buffer is being mutated and must not call back into the console.
pub trait LineStyler {
    fn style_line(&self, event: &LineStyleEvent<'_>) -> Vec<StyleRange>;

    /// Called before the buffer restyles its content from the first line.
    /// Stylers that carry state between lines drop it here.
    fn reset(&self) {}
}

impl<F> LineStyler for F
where
    F: Fn(&LineStyleEvent<'_>) -> Vec<StyleRange>,
{
    fn style_line(&self, event: &LineStyleEvent<'_>) -> Vec<StyleRange> {
        self(event)
    }
}

/// Wrap a closure as a shareable styler.
pub fn styler_fn<F>(f: F) -> Rc<dyn LineStyler>
where
    F: Fn(&LineStyleEvent<'_>) -> Vec<StyleRange> + 'static,
{
    Rc::new(f)
}

/// The active styling mode. Exactly one is in effect at a time.
#[derive(Clone, Default)]
pub enum StyleProvider {
    #[default]
    None,
    /// A single exclusive styler.
    Single(Rc<dyn LineStyler>),
    /// Independent listeners whose ranges are merged per line.
    Listeners(Vec<Rc<dyn LineStyler>>),
}

impl StyleProvider {
    /// Run the active mode over one line and return line-relative ranges.
    pub fn style_line(&self, event: &LineStyleEvent<'_>) -> Vec<StyleRange> {
        match self {
            Self::None => Vec::new(),
            Self::Single(styler) => styler.style_line(event),
            Self::Listeners(listeners) => listeners
                .iter()
                .flat_map(|listener| listener.style_line(event))
                .collect(),
        }
    }

    /// Reset every active styler.
    pub fn reset(&self) {
        match self {
            Self::None => {}
            Self::Single(styler) => styler.reset(),
            Self::Listeners(listeners) => listeners.iter().for_each(|l| l.reset()),
        }
    }

    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The exclusive styler, if that mode is active.
    pub fn single(&self) -> Option<Rc<dyn LineStyler>> {
        match self {
            Self::Single(styler) => Some(Rc::clone(styler)),
            _ => None,
        }
    }

    /// Replace the mode with `styler`, or clear it with `None`.
    pub fn set_single(&mut self, styler: Option<Rc<dyn LineStyler>>) {
        *self = styler.map_or(Self::None, Self::Single);
    }

    /// Add a listener, switching to listener mode if needed.
    pub fn add_listener(&mut self, listener: Rc<dyn LineStyler>) {
        match self {
            Self::Listeners(listeners) => listeners.push(listener),
            _ => *self = Self::Listeners(vec![listener]),
        }
    }

    /// Remove a listener by identity. Returns `true` if it was registered.
    pub fn remove_listener(&mut self, listener: &Rc<dyn LineStyler>) -> bool {
        let Self::Listeners(listeners) = self else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|l| !Rc::ptr_eq(l, listener));
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            *self = Self::None;
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        match self {
            Self::Listeners(listeners) => listeners.len(),
            _ => 0,
        }
    }
}

impl fmt::Debug for StyleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Single(_) => f.write_str("Single(..)"),
            Self::Listeners(listeners) => write!(f, "Listeners({})", listeners.len()),
        }
    }
}
