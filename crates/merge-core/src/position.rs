//! Character-granular positions and ranges.

use std::fmt;

/// A position in a document: zero-based line and character column.
///
/// Columns count Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based character column.
    pub column: usize,
}

impl Position {
    /// Create a new position.
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A character range between two positions.
///
/// Editing treats the range as half-open; [`CharRange::contains_position`] is inclusive of both
/// ends, which is what position projection relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CharRange {
    /// Start position.
    pub start: Position,
    /// End position.
    pub end: Position,
}

impl CharRange {
    /// Create a range from two positions (ordered so that `start <= end`).
    pub fn new(start: Position, end: Position) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// An empty range at `position`.
    pub fn collapsed(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Returns `true` if the range covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Inclusive containment check.
    pub fn contains_position(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }

    /// Smallest range covering both `self` and `other`.
    pub fn plus_range(&self, other: &CharRange) -> CharRange {
        CharRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Returns `true` if `self` ends at or before `other` starts.
    pub fn is_before(&self, other: &CharRange) -> bool {
        self.end <= other.start
    }
}

impl fmt::Display for CharRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A line/column distance between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TextLength {
    line_count: usize,
    column_count: usize,
}

impl TextLength {
    /// Distance from `from` to `to` (`from <= to`).
    pub(crate) fn between(from: Position, to: Position) -> Self {
        if from.line == to.line {
            Self {
                line_count: 0,
                column_count: to.column.saturating_sub(from.column),
            }
        } else {
            Self {
                line_count: to.line - from.line,
                column_count: to.column,
            }
        }
    }

    pub(crate) fn add_to(self, position: Position) -> Position {
        if self.line_count == 0 {
            Position::new(position.line, position.column + self.column_count)
        } else {
            Position::new(position.line + self.line_count, self.column_count)
        }
    }
}
