use ropey::Rope;

use super::LineIndex;
use crate::style::{LineStyleEvent, StyleProvider, StyleRange, StyleStore, markup};

/// What kind of mutation produced a [`ModifyEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyKind {
    SetText,
    Append,
    Replace,
}

/// Notification describing one buffer mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyEvent {
    pub kind: ModifyKind,
    /// Char offset where the change starts.
    pub start: usize,
    /// Number of chars removed at `start`.
    pub removed: usize,
    /// Text inserted at `start`.
    pub text: String,
}

/// The unsynced window of a buffer, rendered and ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSync {
    /// Replace the whole surface rather than append to it.
    pub full: bool,
    pub from: usize,
    /// Content length snapshot taken when the window was rendered.
    pub to: usize,
    pub generation: u64,
    pub html: String,
}

/// A rope-backed, append-mostly text buffer.
///
/// Keeps a [`LineIndex`] and [`StyleStore`] in step with the content and
/// tracks the write position: how much of the content a render surface has
/// already received. Appends only extend the index and style the lines they
/// complete; any other edit invalidates everything and forces a full resend.
pub struct TextBuffer {
    rope: Rope,
    lines: LineIndex,
    styles: StyleStore,
    provider: StyleProvider,
    /// Start of the first line not yet handed to the provider.
    styled_upto: usize,
    write_position: usize,
    full_refresh: bool,
    /// Bumped by every invalidating edit.
    generation: u64,
}

impl TextBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            lines: LineIndex::new(),
            styles: StyleStore::new(),
            provider: StyleProvider::None,
            styled_upto: 0,
            write_position: 0,
            full_refresh: false,
            generation: 0,
        }
    }

    // --- Mutation ---

    /// Replace all content and force a full resend.
    pub fn set_text(&mut self, text: &str) -> ModifyEvent {
        let removed = self.rope.len_chars();
        self.rope = Rope::from_str(text);
        self.invalidate();
        ModifyEvent {
            kind: ModifyKind::SetText,
            start: 0,
            removed,
            text: text.to_string(),
        }
    }

    /// Append `text` without touching the write position.
    ///
    /// Returns `None` when `text` is empty.
    pub fn append(&mut self, text: &str) -> Option<ModifyEvent> {
        if text.is_empty() {
            return None;
        }
        let old_len = self.rope.len_chars();
        self.rope.insert(old_len, text);
        self.lines.update_line_offsets(&self.rope, old_len);
        self.style_completed_lines();
        Some(ModifyEvent {
            kind: ModifyKind::Append,
            start: old_len,
            removed: 0,
            text: text.to_string(),
        })
    }

    /// Replace `length` chars at `start` with `text`.
    ///
    /// Does nothing when `start` is at or past the end. `length` is clamped
    /// to the content. Offsets after the edit are no longer meaningful, so
    /// styles and line starts are recomputed from scratch and the surface
    /// gets a full resend.
    pub fn replace_text_range(
        &mut self,
        start: usize,
        length: usize,
        text: &str,
    ) -> Option<ModifyEvent> {
        let len = self.rope.len_chars();
        if start >= len {
            return None;
        }
        let removed = length.min(len - start);
        self.rope.remove(start..start + removed);
        self.rope.insert(start, text);
        self.invalidate();
        Some(ModifyEvent {
            kind: ModifyKind::Replace,
            start,
            removed,
            text: text.to_string(),
        })
    }

    /// Record a decoration. Out-of-bounds or empty ranges are dropped.
    pub fn set_style_range(&mut self, range: StyleRange) -> bool {
        self.styles.insert(range, self.rope.len_chars())
    }

    // --- Styling policy ---

    pub const fn provider(&self) -> &StyleProvider {
        &self.provider
    }

    /// Mutable access to the styling policy. Changes apply to lines completed
    /// from now on; already styled lines keep their ranges.
    pub const fn provider_mut(&mut self) -> &mut StyleProvider {
        &mut self.provider
    }

    // --- Queries ---

    /// The full text content of the buffer.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn line_count(&self) -> usize {
        self.lines.line_count()
    }

    /// Char offset where line `line` starts, or `None` when out of range.
    pub fn offset_at_line(&self, line: usize) -> Option<usize> {
        self.lines.offset_at_line(line)
    }

    /// Line containing the char at `offset`.
    pub fn line_at_offset(&self, offset: usize) -> usize {
        self.lines.line_at_offset(offset)
    }

    /// Content of a line, without its line break.
    pub fn line_at(&self, line: usize) -> Option<String> {
        let start = self.lines.offset_at_line(line)?;
        let end = self
            .lines
            .offset_at_line(line + 1)
            .map_or(self.rope.len_chars(), |next| next - 1);
        let text = self.rope.slice(start..end).to_string();
        Some(text.trim_end_matches('\r').to_string())
    }

    pub const fn styles(&self) -> &StyleStore {
        &self.styles
    }

    pub const fn rope(&self) -> &Rope {
        &self.rope
    }

    // --- Sync bookkeeping ---

    pub const fn write_position(&self) -> usize {
        self.write_position
    }

    pub const fn needs_full_refresh(&self) -> bool {
        self.full_refresh
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether anything remains to be sent to the surface.
    pub fn has_unsynced(&self) -> bool {
        self.full_refresh || self.write_position < self.rope.len_chars()
    }

    /// Render the unsynced window, snapshotting the current length.
    pub fn pending_sync(&self) -> Option<PendingSync> {
        let to = self.rope.len_chars();
        let (full, from) = if self.full_refresh {
            (true, 0)
        } else if self.write_position < to {
            (false, self.write_position)
        } else {
            return None;
        };
        Some(PendingSync {
            full,
            from,
            to,
            generation: self.generation,
            html: markup::render_html(&self.rope, &self.styles, from, to),
        })
    }

    /// Record that `sent` reached the surface.
    ///
    /// Advances the write position to the snapshot length, never to the
    /// current length, so text appended while the window was in flight stays
    /// unsynced. Ignored (returns `false`) if the buffer was invalidated in
    /// the meantime, leaving the pending full refresh in place.
    pub fn mark_synced(&mut self, sent: &PendingSync) -> bool {
        if sent.generation != self.generation {
            return false;
        }
        self.write_position = self
            .write_position
            .max(sent.to)
            .min(self.rope.len_chars());
        if sent.full {
            self.full_refresh = false;
        }
        true
    }

    // --- Private helpers ---

    fn invalidate(&mut self) {
        self.styles.clear();
        self.lines.reset();
        self.lines.update_line_offsets(&self.rope, 0);
        self.styled_upto = 0;
        self.write_position = 0;
        self.full_refresh = true;
        self.generation += 1;
        self.provider.reset();
        self.style_completed_lines();
    }

    /// Hand every line completed since the last call to the provider.
    fn style_completed_lines(&mut self) {
        if self.provider.is_none() {
            let last_line = self.lines.line_count() - 1;
            self.styled_upto = self.lines.offset_at_line(last_line).unwrap_or(0);
            return;
        }

        let len = self.rope.len_chars();
        loop {
            let line = self.lines.line_at_offset(self.styled_upto);
            let Some(next) = self.lines.offset_at_line(line + 1) else {
                break;
            };
            let start = self.styled_upto;
            let raw = self.rope.slice(start..next - 1);
            let line_text: String = raw.chars().filter(|&c| c != '\r').collect();
            let kept: Option<Vec<usize>> = (line_text.len() != raw.len_bytes()).then(|| {
                raw.chars()
                    .enumerate()
                    .filter(|&(_, c)| c != '\r')
                    .map(|(i, _)| i)
                    .collect()
            });
            let ranges = self.provider.style_line(&LineStyleEvent {
                line_offset: start,
                line_text: &line_text,
            });
            for range in ranges {
                let range = match &kept {
                    Some(kept) => unstrip(range, kept),
                    None => range,
                };
                self.styles.insert(range.shifted(start), len);
            }
            self.styled_upto = next;
        }
    }
}

/// Map a range over `\r`-stripped line text onto the raw line, where `kept`
/// holds the raw index of each stripped char.
fn unstrip(mut range: StyleRange, kept: &[usize]) -> StyleRange {
    let Some(&first) = kept.get(range.start) else {
        return range;
    };
    let last = range.start + range.length.saturating_sub(1);
    let end = kept.get(last).map_or(first + range.length, |&i| i + 1);
    range.start = first;
    range.length = end - first;
    range
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer")
            .field(
                "rope",
                &format_args!(
                    "Rope({} chars, {} lines)",
                    self.rope.len_chars(),
                    self.lines.line_count()
                ),
            )
            .field("styles", &self.styles.len())
            .field("provider", &self.provider)
            .field("write_position", &self.write_position)
            .field("full_refresh", &self.full_refresh)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
