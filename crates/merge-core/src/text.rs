//! Line helpers and immutable text snapshots.
//!
//! Every document taking part in a merge is read through a [`TextSnapshot`]: a cheap-to-clone,
//! immutable list of lines captured at a specific document version. Diff results carry the
//! snapshots they were computed against, so derived ranges never index into a document that has
//! changed underneath them.

use crate::position::{CharRange, Position};
use std::sync::Arc;

/// Split text into logical lines.
///
/// `str::split('\n')` preserves trailing empty segments, which matches typical editor line
/// semantics (N newlines => N+1 lines). A trailing `'\r'` is stripped from every line.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// Normalize CRLF and lone CR line breaks to LF.
pub(crate) fn normalize_newlines(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Returns the sub-slice of `line` between two character columns (clamped to the line).
pub(crate) fn char_slice(line: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let mut indices = line.char_indices().map(|(idx, _)| idx).chain(Some(line.len()));
    let Some(start_byte) = indices.nth(start) else {
        return "";
    };
    let end_byte = indices.nth(end - start - 1).unwrap_or(line.len());
    &line[start_byte..end_byte]
}

/// An immutable snapshot of a document's lines.
#[derive(Debug, Clone)]
pub struct TextSnapshot {
    lines: Arc<[String]>,
    version_id: u64,
}

impl TextSnapshot {
    /// Create a snapshot from already-split lines.
    ///
    /// An empty line list is normalized to a single empty line (an empty document has one line).
    pub fn new(mut lines: Vec<String>, version_id: u64) -> Self {
        if lines.is_empty() {
            lines.push(String::new());
        }
        Self {
            lines: lines.into(),
            version_id,
        }
    }

    /// Create a version-0 snapshot from text.
    pub fn from_text(text: &str) -> Self {
        Self::new(split_lines(&normalize_newlines(text)), 0)
    }

    /// Document version this snapshot was taken at.
    pub fn version_id(&self) -> u64 {
        self.version_id
    }

    /// Number of lines (always at least 1).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// All lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Line content without its line break.
    ///
    /// # Panics
    ///
    /// Panics if `line` is out of bounds.
    pub fn line(&self, line: usize) -> &str {
        &self.lines[line]
    }

    /// Length of a line in characters.
    pub fn line_length(&self, line: usize) -> usize {
        self.lines[line].chars().count()
    }

    /// Full text joined with LF.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Clamp a position into the document.
    ///
    /// Lines past the end clamp to the end of the last line; columns clamp to the line length.
    pub fn validate_position(&self, position: Position) -> Position {
        let last_line = self.line_count() - 1;
        if position.line > last_line {
            return Position::new(last_line, self.line_length(last_line));
        }
        Position::new(
            position.line,
            position.column.min(self.line_length(position.line)),
        )
    }

    /// Text between two positions, after clamping both into the document.
    pub fn value_in_range(&self, range: CharRange) -> String {
        let start = self.validate_position(range.start);
        let end = self.validate_position(range.end);
        if start >= end {
            return String::new();
        }

        if start.line == end.line {
            return char_slice(&self.lines[start.line], start.column, end.column).to_string();
        }

        let first = &self.lines[start.line];
        let mut out = String::new();
        out.push_str(char_slice(first, start.column, usize::MAX));
        for line in &self.lines[start.line + 1..end.line] {
            out.push('\n');
            out.push_str(line);
        }
        out.push('\n');
        out.push_str(char_slice(&self.lines[end.line], 0, end.column));
        out
    }
}

impl PartialEq for TextSnapshot {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.lines, &other.lines) || self.lines == other.lines
    }
}

impl Eq for TextSnapshot {}
