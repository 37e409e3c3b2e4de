//! Ordered collection of style ranges keyed by start offset.

use std::collections::BTreeMap;

use super::StyleRange;

/// Style ranges keyed by start offset.
///
/// A range at an existing start replaces the previous one. Overlapping ranges
/// with different starts are kept as-is; the markup walk resolves them.
#[derive(Debug, Clone, Default)]
pub struct StyleStore {
    ranges: BTreeMap<usize, StyleRange>,
}

impl StyleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `range` if it lies inside a buffer of `content_len` chars.
    ///
    /// Returns `false` (and stores nothing) for zero-length ranges or ranges
    /// starting at or past the end of the content.
    pub fn insert(&mut self, range: StyleRange, content_len: usize) -> bool {
        if range.length == 0 || range.start >= content_len {
            return false;
        }
        self.ranges.insert(range.start, range);
        true
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The range starting exactly at `start`.
    pub fn get(&self, start: usize) -> Option<&StyleRange> {
        self.ranges.get(&start)
    }

    /// Ranges in ascending start order.
    pub fn iter(&self) -> impl Iterator<Item = &StyleRange> {
        self.ranges.values()
    }
}
