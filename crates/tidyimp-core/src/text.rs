// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Source positions and the immutable file-text model.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Line/column values of 0 are clamped to 1

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

// ============================================================================
// FilePos
// ============================================================================

/// A position in source code specified as line and column, both 1-indexed.
///
/// # Example
///
/// ```
/// use tidyimp_core::FilePos;
///
/// let pos = FilePos::new(10, 5);
/// assert_eq!(pos.line, 10);
/// assert_eq!(pos.col, 5);
/// assert!(pos < FilePos::new(10, 6));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilePos {
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column number.
    pub col: usize,
}

impl FilePos {
    /// Create a new position. Values of 0 are clamped to 1.
    pub fn new(line: usize, col: usize) -> Self {
        Self {
            line: line.max(1),
            col: col.max(1),
        }
    }

    /// The start of a file.
    pub fn start() -> Self {
        Self { line: 1, col: 1 }
    }
}

impl Default for FilePos {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for FilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Error when a position cannot be resolved against a text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    /// Line number exceeds the line count of the text.
    #[error("line {line} out of range (max: {max_line})")]
    LineOutOfRange { line: usize, max_line: usize },
    /// Column exceeds the line length.
    #[error("column {col} out of range on line {line} (line length: {line_len})")]
    ColumnOutOfRange {
        line: usize,
        col: usize,
        line_len: usize,
    },
    /// Byte offset exceeds the text length.
    #[error("byte offset {offset} out of range (text length: {len})")]
    OffsetOutOfRange { offset: usize, len: usize },
}

// ============================================================================
// FileText
// ============================================================================

/// Immutable source text with an optional filename and a start position.
///
/// A `FileText` knows where it starts (`startpos`, for slices taken out of a
/// larger file) and keeps a line-start table so position/offset conversions
/// are O(log N).
///
/// The terminal-newline convention of the input is preserved: the line count
/// is `count('\n')` plus one if the text does not end with a newline.
///
/// # Example
///
/// ```
/// use tidyimp_core::{FilePos, FileText};
///
/// let text = FileText::new("import os\nimport sys\n");
/// assert_eq!(text.line_count(), 2);
/// assert_eq!(text.offset_to_pos(10), FilePos::new(2, 1));
/// assert_eq!(text.pos_to_offset(FilePos::new(2, 1)).unwrap(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct FileText {
    text: Arc<str>,
    filename: Option<PathBuf>,
    startpos: FilePos,
    line_starts: Arc<[usize]>,
}

impl FileText {
    /// Create a `FileText` from a string, with no filename.
    pub fn new(text: impl Into<String>) -> Self {
        Self::build(text.into(), None, FilePos::start())
    }

    /// Create a `FileText` with an associated filename.
    pub fn with_filename(text: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self::build(text.into(), Some(filename.into()), FilePos::start())
    }

    /// Return a copy of this text with a different start position.
    pub fn at_startpos(mut self, startpos: FilePos) -> Self {
        self.startpos = startpos;
        self
    }

    fn build(text: String, filename: Option<PathBuf>, startpos: FilePos) -> Self {
        let mut line_starts = vec![0usize];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            text: text.into(),
            filename,
            startpos,
            line_starts: line_starts.into(),
        }
    }

    /// The underlying text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The filename, if any.
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// The position of the first character.
    pub fn startpos(&self) -> FilePos {
        self.startpos
    }

    /// Whether the text ends with a newline.
    pub fn ends_with_newline(&self) -> bool {
        self.text.ends_with('\n')
    }

    /// Number of lines, honoring the terminal-newline convention:
    /// `count('\n')` plus one if the text does not end with `'\n'`.
    pub fn line_count(&self) -> usize {
        let newlines = self.line_starts.len() - 1;
        if self.text.is_empty() {
            0
        } else if self.ends_with_newline() {
            newlines
        } else {
            newlines + 1
        }
    }

    /// Convert a byte offset to a position, relative to `startpos`.
    ///
    /// Offsets past the end of the text are clamped to the end.
    pub fn offset_to_pos(&self, offset: usize) -> FilePos {
        let offset = offset.min(self.text.len());
        // partition_point gives the first line whose start is > offset.
        let line_idx = self.line_starts.partition_point(|&s| s <= offset) - 1;
        let col0 = self.text[self.line_starts[line_idx]..offset].chars().count();
        if line_idx == 0 {
            FilePos::new(self.startpos.line, self.startpos.col + col0)
        } else {
            FilePos::new(self.startpos.line + line_idx, col0 + 1)
        }
    }

    /// Convert a position (relative to `startpos`) to a byte offset.
    pub fn pos_to_offset(&self, pos: FilePos) -> Result<usize, PositionError> {
        if pos.line < self.startpos.line {
            return Err(PositionError::LineOutOfRange {
                line: pos.line,
                max_line: self.startpos.line + self.line_starts.len() - 1,
            });
        }
        let line_idx = pos.line - self.startpos.line;
        if line_idx >= self.line_starts.len() {
            return Err(PositionError::LineOutOfRange {
                line: pos.line,
                max_line: self.startpos.line + self.line_starts.len() - 1,
            });
        }
        let line_start = self.line_starts[line_idx];
        let col_base = if line_idx == 0 { self.startpos.col } else { 1 };
        if pos.col < col_base {
            return Err(PositionError::ColumnOutOfRange {
                line: pos.line,
                col: pos.col,
                line_len: 0,
            });
        }
        let mut want = pos.col - col_base;
        let mut offset = line_start;
        for ch in self.text[line_start..].chars() {
            if want == 0 {
                return Ok(offset);
            }
            if ch == '\n' {
                break;
            }
            want -= 1;
            offset += ch.len_utf8();
        }
        if want == 0 {
            Ok(offset)
        } else {
            Err(PositionError::ColumnOutOfRange {
                line: pos.line,
                col: pos.col,
                line_len: self.text[line_start..]
                    .chars()
                    .take_while(|&c| c != '\n')
                    .count(),
            })
        }
    }

    /// The position one past the last character.
    pub fn end_pos(&self) -> FilePos {
        self.offset_to_pos(self.text.len())
    }

    /// Substring by byte range.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        &self.text[start..end]
    }

    /// Concatenate texts, keeping the filename of the first part.
    pub fn concatenate(parts: &[&str]) -> String {
        parts.concat()
    }
}

impl PartialEq for FileText {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.startpos == other.startpos
    }
}

impl Eq for FileText {}

impl fmt::Display for FileText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ============================================================================
// Tests
// ============================================================================
