//! Line-level and character-level replacement edits.

use crate::line_range::LineRange;
use crate::position::{CharRange, Position};

/// Replace a range of whole lines with new lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineRangeEdit {
    /// Lines being replaced.
    pub range: LineRange,
    /// Replacement lines (without line breaks).
    pub new_lines: Vec<String>,
}

impl LineRangeEdit {
    /// Create a line edit.
    pub fn new(range: LineRange, new_lines: Vec<String>) -> Self {
        Self { range, new_lines }
    }

    /// Convert to a character edit against a document with `line_count` lines.
    ///
    /// Ranges that end before the last line replace `(start, 0)..(end, 0)` and terminate every
    /// new line with `'\n'`. Ranges reaching the end of the document have no trailing line break
    /// to consume, so the edit starts at the end of the preceding line instead.
    pub fn to_range_edit(&self, line_count: usize) -> RangeEdit {
        let range = self.range;
        if range.end_line_exclusive() < line_count {
            let new_text: String = self
                .new_lines
                .iter()
                .flat_map(|line| [line.as_str(), "\n"])
                .collect();
            return RangeEdit::new(
                CharRange::new(
                    Position::new(range.start_line(), 0),
                    Position::new(range.end_line_exclusive(), 0),
                ),
                new_text,
            );
        }

        let last_line = line_count.saturating_sub(1);
        if range.start_line() == 0 {
            return RangeEdit::new(
                CharRange::new(Position::new(0, 0), Position::new(last_line, usize::MAX)),
                self.new_lines.join("\n"),
            );
        }

        let new_text: String = self
            .new_lines
            .iter()
            .flat_map(|line| ["\n", line.as_str()])
            .collect();
        RangeEdit::new(
            CharRange::new(
                Position::new(range.start_line() - 1, usize::MAX),
                Position::new(last_line, usize::MAX),
            ),
            new_text,
        )
    }
}

/// Replace a character range with new text.
///
/// Columns may exceed line lengths (`usize::MAX` means "end of line"); documents clamp them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeEdit {
    /// Range being replaced.
    pub range: CharRange,
    /// Replacement text.
    pub new_text: String,
}

impl RangeEdit {
    /// Create a character edit.
    pub fn new(range: CharRange, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }
}
