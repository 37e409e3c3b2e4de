//! Append-mostly text storage.
//!
//! Provides a rope-backed buffer that keeps its line index and style store
//! in step with every mutation and remembers how much of itself has already
//! been sent to a render surface.

mod buffer;
mod line_index;

pub use buffer::{ModifyEvent, ModifyKind, PendingSync, TextBuffer};
pub use line_index::LineIndex;
