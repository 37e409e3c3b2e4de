//! Incremental reads of a growing file.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// What a read found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailUpdate {
    Unchanged,
    /// New text past the previous end.
    Append(String),
    /// The file shrank or was replaced; this is its whole content.
    Reset(String),
}

/// Reads a file from the last seen offset onward.
///
/// Bytes of a UTF-8 sequence split across two reads are held back until the
/// rest arrives, so appended text never contains a spurious replacement
/// character. Invalid bytes still decode as U+FFFD.
#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    offset: u64,
    carry: Vec<u8>,
}

impl LogTail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            carry: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes consumed so far, including held-back partial sequences.
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the whole file from the start.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or read.
    pub fn read_all(&mut self) -> io::Result<String> {
        let _scope = crate::perf::scope("tail.read_all");
        self.offset = 0;
        self.carry.clear();
        let mut file = File::open(&self.path)?;
        let text = self.read_from(&mut file)?;
        crate::perf::log_event("tail.read_all", format!("bytes={}", self.offset));
        Ok(text)
    }

    /// Read whatever was appended since the last read.
    ///
    /// A file shorter than the consumed offset counts as truncated and is
    /// read again from the start.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or read.
    pub fn read_update(&mut self) -> io::Result<TailUpdate> {
        let mut file = File::open(&self.path)?;
        let len = file.metadata()?.len();
        if len < self.offset {
            tracing::debug!(len, offset = self.offset, "file truncated; reloading");
            crate::perf::log_event(
                "tail.truncated",
                format!("len={len} offset={}", self.offset),
            );
            return self.read_all().map(TailUpdate::Reset);
        }
        if len == self.offset {
            return Ok(TailUpdate::Unchanged);
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let before = self.offset;
        let text = self.read_from(&mut file)?;
        crate::perf::log_event(
            "tail.append",
            format!("bytes={} chars={}", self.offset - before, text.chars().count()),
        );
        if text.is_empty() {
            Ok(TailUpdate::Unchanged)
        } else {
            Ok(TailUpdate::Append(text))
        }
    }

    fn read_from(&mut self, file: &mut File) -> io::Result<String> {
        let mut bytes = std::mem::take(&mut self.carry);
        let read = file.read_to_end(&mut bytes)?;
        self.offset += u64::try_from(read).unwrap_or(u64::MAX);
        let text = decode_utf8_prefix(&mut bytes);
        self.carry = bytes;
        Ok(text)
    }
}

/// Decode `bytes`, leaving an incomplete trailing sequence in place.
pub(crate) fn decode_utf8_prefix(bytes: &mut Vec<u8>) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest: &[u8] = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                rest = &[];
                break;
            }
            Err(err) => {
                let (valid, tail) = rest.split_at(err.valid_up_to());
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match err.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        rest = &tail[len..];
                    }
                    None => {
                        rest = tail;
                        break;
                    }
                }
            }
        }
    }
    let carry = rest.to_vec();
    *bytes = carry;
    out
}
