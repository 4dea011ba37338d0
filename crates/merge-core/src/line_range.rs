//! Half-open line intervals.

use crate::position::{CharRange, Position};
use crate::text::TextSnapshot;
use std::fmt;

/// A half-open interval of zero-based line numbers: `[start_line, start_line + line_count)`.
///
/// Values are immutable; every transform returns a new range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LineRange {
    start_line: usize,
    line_count: usize,
}

impl LineRange {
    /// Create a range from a start line and a line count.
    pub const fn new(start_line: usize, line_count: usize) -> Self {
        Self {
            start_line,
            line_count,
        }
    }

    /// Create a range from a start line and an exclusive end line.
    ///
    /// # Panics
    ///
    /// Panics if `end_line_exclusive < start_line`.
    pub fn from_line_numbers(start_line: usize, end_line_exclusive: usize) -> Self {
        assert!(
            start_line <= end_line_exclusive,
            "invalid line range: {start_line}..{end_line_exclusive}"
        );
        Self::new(start_line, end_line_exclusive - start_line)
    }

    /// First line of the range.
    pub fn start_line(&self) -> usize {
        self.start_line
    }

    /// Number of lines in the range.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// First line after the range.
    pub fn end_line_exclusive(&self) -> usize {
        self.start_line + self.line_count
    }

    /// Returns `true` if the range contains no lines.
    pub fn is_empty(&self) -> bool {
        self.line_count == 0
    }

    /// Smallest range enclosing both ranges.
    pub fn join(&self, other: &LineRange) -> LineRange {
        LineRange::from_line_numbers(
            self.start_line.min(other.start_line),
            self.end_line_exclusive().max(other.end_line_exclusive()),
        )
    }

    /// Returns `true` if the ranges overlap or are adjacent.
    pub fn touches(&self, other: &LineRange) -> bool {
        self.start_line <= other.end_line_exclusive()
            && other.start_line <= self.end_line_exclusive()
    }

    /// Returns `true` if `self` ends at or before `other` starts.
    pub fn is_before(&self, other: &LineRange) -> bool {
        self.end_line_exclusive() <= other.start_line
    }

    /// Returns `true` if `other` lies completely inside `self`.
    pub fn contains_range(&self, other: &LineRange) -> bool {
        self.start_line <= other.start_line
            && other.end_line_exclusive() <= self.end_line_exclusive()
    }

    /// Returns `true` if `line` is inside the range.
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line < self.end_line_exclusive()
    }

    /// Overlap of two ranges, if any lines are shared.
    pub fn intersect(&self, other: &LineRange) -> Option<LineRange> {
        let start = self.start_line.max(other.start_line);
        let end = self.end_line_exclusive().min(other.end_line_exclusive());
        (start < end).then(|| LineRange::from_line_numbers(start, end))
    }

    /// Shift the whole range by `delta` lines.
    ///
    /// # Panics
    ///
    /// Panics if the shift moves the range before line 0.
    pub fn delta(&self, delta: isize) -> LineRange {
        LineRange::new(shift(self.start_line, delta), self.line_count)
    }

    /// Move the start by `delta` lines, keeping the end fixed.
    pub fn delta_start(&self, delta: isize) -> LineRange {
        LineRange::from_line_numbers(shift(self.start_line, delta), self.end_line_exclusive())
    }

    /// Move the end by `delta` lines, keeping the start fixed.
    pub fn delta_end(&self, delta: isize) -> LineRange {
        LineRange::from_line_numbers(self.start_line, shift(self.end_line_exclusive(), delta))
    }

    /// The lines of `document` covered by this range.
    ///
    /// # Panics
    ///
    /// Panics if the range extends past the end of the document.
    pub fn get_lines(&self, document: &TextSnapshot) -> Vec<String> {
        document.lines()[self.start_line..self.end_line_exclusive()].to_vec()
    }

    /// Convert to a character range, looking up line lengths in `document`.
    ///
    /// Ranges ending before the last line become `(start, 0)..(end, 0)`. Ranges that reach the end
    /// of the document have no line break after them, so they instead start at the end of the
    /// preceding line (taking that line break) and end at the end of the last line.
    ///
    /// # Panics
    ///
    /// Panics if the range extends past the end of the document.
    pub fn to_char_range(&self, document: &TextSnapshot) -> CharRange {
        let line_count = document.line_count();
        assert!(
            self.end_line_exclusive() <= line_count,
            "line range {self} exceeds document with {line_count} lines"
        );

        if self.end_line_exclusive() < line_count {
            return CharRange::new(
                Position::new(self.start_line, 0),
                Position::new(self.end_line_exclusive(), 0),
            );
        }

        let last_line = line_count - 1;
        let end = Position::new(last_line, document.line_length(last_line));
        if self.start_line == 0 {
            return CharRange::new(Position::new(0, 0), end);
        }
        let previous = self.start_line - 1;
        CharRange::new(Position::new(previous, document.line_length(previous)), end)
    }

    /// The range from the start of the first line to the end of the last line, or `None` for an
    /// empty range.
    pub fn to_inclusive_char_range(&self, document: &TextSnapshot) -> Option<CharRange> {
        if self.is_empty() {
            return None;
        }
        let last = self.end_line_exclusive() - 1;
        Some(CharRange::new(
            Position::new(self.start_line, 0),
            Position::new(last, document.line_length(last)),
        ))
    }
}

fn shift(line: usize, delta: isize) -> usize {
    line.checked_add_signed(delta)
        .unwrap_or_else(|| panic!("line {line} shifted by {delta} leaves the document"))
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_line, self.end_line_exclusive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_and_touches() {
        let a = LineRange::new(2, 3);
        let b = LineRange::new(5, 1);
        let c = LineRange::new(7, 0);

        assert!(a.touches(&b));
        assert!(!a.touches(&c));
        assert_eq!(a.join(&c), LineRange::from_line_numbers(2, 7));
        assert!(a.is_before(&b));
    }

    #[test]
    fn test_empty_range_touches_neighbours() {
        let insertion = LineRange::new(4, 0);
        assert!(insertion.touches(&LineRange::new(2, 2)));
        assert!(insertion.touches(&LineRange::new(4, 3)));
        assert!(!insertion.touches(&LineRange::new(5, 1)));
    }

    #[test]
    fn test_delta_variants() {
        let range = LineRange::new(4, 2);
        assert_eq!(range.delta(-3), LineRange::new(1, 2));
        assert_eq!(range.delta_start(1), LineRange::new(5, 1));
        assert_eq!(range.delta_end(2), LineRange::new(4, 4));
    }

    #[test]
    #[should_panic]
    fn test_delta_before_document_start_panics() {
        LineRange::new(1, 1).delta(-2);
    }

    #[test]
    fn test_contains_and_intersect() {
        let range = LineRange::new(3, 4);
        assert!(range.contains_line(3));
        assert!(!range.contains_line(7));
        assert!(range.contains_range(&LineRange::new(4, 2)));
        assert_eq!(
            range.intersect(&LineRange::new(6, 5)),
            Some(LineRange::new(6, 1))
        );
        assert_eq!(range.intersect(&LineRange::new(7, 1)), None);
    }

    #[test]
    fn test_to_char_range_inside_and_at_document_end() {
        let document = TextSnapshot::from_text("a\nbb\nccc");

        assert_eq!(
            LineRange::new(0, 1).to_char_range(&document),
            CharRange::new(Position::new(0, 0), Position::new(1, 0))
        );
        assert_eq!(
            LineRange::new(1, 2).to_char_range(&document),
            CharRange::new(Position::new(0, 1), Position::new(2, 3))
        );
        assert_eq!(
            LineRange::new(3, 0).to_char_range(&document),
            CharRange::new(Position::new(2, 3), Position::new(2, 3))
        );
        assert_eq!(
            LineRange::new(0, 3).to_char_range(&document),
            CharRange::new(Position::new(0, 0), Position::new(2, 3))
        );
    }

    #[test]
    #[should_panic]
    fn test_to_char_range_out_of_bounds_panics() {
        let document = TextSnapshot::from_text("a");
        LineRange::new(0, 2).to_char_range(&document);
    }

    #[test]
    fn test_get_lines() {
        let document = TextSnapshot::from_text("a\nb\nc");
        assert_eq!(LineRange::new(1, 2).get_lines(&document), vec!["b", "c"]);
        assert!(LineRange::new(3, 0).get_lines(&document).is_empty());
    }
}
