//! Incremental line-start index.
//!
//! Offsets are char indices into the owning rope. The index only ever grows
//! while text is appended; invalidating edits reset it and rebuild from 0.

use ropey::Rope;

/// Ordered, strictly increasing line-start offsets.
///
/// Always contains offset 0, so an empty buffer has one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Create an index describing an empty buffer.
    pub fn new() -> Self {
        Self {
            line_starts: vec![0],
        }
    }

    /// Forget every line start except the first.
    pub fn reset(&mut self) {
        self.line_starts.clear();
        self.line_starts.push(0);
    }

    /// Scan `content[start_pos..]` and record every line start found there.
    ///
    /// `start_pos` itself is recorded when it is 0 or directly follows a line
    /// break, so an append landing exactly on a boundary opens a new line.
    /// Cost is proportional to the scanned tail, not the whole buffer.
    pub fn update_line_offsets(&mut self, content: &Rope, start_pos: usize) {
        let len = content.len_chars();
        if start_pos > len {
            return;
        }
        if start_pos == 0 || content.char(start_pos - 1) == '\n' {
            self.record(start_pos);
        }
        for (i, ch) in content.chars_at(start_pos).enumerate() {
            if ch == '\n' {
                self.record(start_pos + i + 1);
            }
        }
    }

    /// Number of lines, counting a trailing empty line after a final break.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Char offset where line `line` starts, or `None` when out of range.
    pub fn offset_at_line(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Line containing `offset`. Offsets past the end map to the last line.
    pub fn line_at_offset(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        }
    }

    fn record(&mut self, offset: usize) {
        if self.line_starts.last().is_none_or(|&last| offset > last) {
            self.line_starts.push(offset);
        }
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}
