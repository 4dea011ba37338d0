//! Mappings between coordinate spaces of two documents.
//!
//! A mapping pairs a region of an *original* document with the region of a *modified* document
//! it corresponds to. Ordered, gap-consistent sequences of mappings form a total, monotonic
//! projection from one document's coordinates to the other's
//! ([`DocumentLineRangeMap`], [`DocumentRangeMap`]).

use crate::line_range::LineRange;
use crate::mapping_alignment::{LineMapping, MappingAlignment};
use crate::position::{CharRange, Position, TextLength};
use crate::range_editing::LineRangeEdit;
use crate::text::TextSnapshot;

/// A character-level mapping between two documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeMapping {
    /// Range in the original document.
    pub original_range: CharRange,
    /// Corresponding range in the modified document.
    pub modified_range: CharRange,
}

impl RangeMapping {
    /// Create a new mapping.
    pub fn new(original_range: CharRange, modified_range: CharRange) -> Self {
        Self {
            original_range,
            modified_range,
        }
    }

    /// Swap the original and modified roles.
    pub fn reverse(&self) -> RangeMapping {
        RangeMapping::new(self.modified_range, self.original_range)
    }
}

/// A line-level mapping between two documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRangeMapping {
    /// Range in the original document.
    pub original_range: LineRange,
    /// Corresponding range in the modified document.
    pub modified_range: LineRange,
}

impl LineRangeMapping {
    /// Create a new mapping.
    pub fn new(original_range: LineRange, modified_range: LineRange) -> Self {
        Self {
            original_range,
            modified_range,
        }
    }

    /// Swap the original and modified roles.
    pub fn reverse(&self) -> LineRangeMapping {
        LineRangeMapping::new(self.modified_range, self.original_range)
    }

    /// Join mappings into the smallest mapping enclosing all of them on both sides.
    ///
    /// Returns `None` for an empty input.
    pub fn join<'a>(mappings: impl IntoIterator<Item = &'a LineRangeMapping>) -> Option<Self> {
        mappings.into_iter().fold(None, |acc: Option<LineRangeMapping>, m| {
            Some(match acc {
                None => *m,
                Some(acc) => LineRangeMapping::new(
                    acc.original_range.join(&m.original_range),
                    acc.modified_range.join(&m.modified_range),
                ),
            })
        })
    }

    /// Grow the original range to `extended`, growing the modified range by the same amounts.
    ///
    /// # Panics
    ///
    /// Panics if `extended` does not contain the current original range.
    pub fn extend_original_range(&self, extended: LineRange) -> LineRangeMapping {
        assert!(
            extended.contains_range(&self.original_range),
            "{extended} does not contain {}",
            self.original_range
        );
        let start_delta = self.original_range.start_line() - extended.start_line();
        let end_delta = extended.end_line_exclusive() - self.original_range.end_line_exclusive();
        LineRangeMapping::new(
            extended,
            LineRange::new(
                self.modified_range.start_line() - start_delta,
                self.modified_range.line_count() + start_delta + end_delta,
            ),
        )
    }

    /// Line delta between the original and modified coordinates after this mapping.
    pub fn resulting_delta(&self) -> isize {
        self.modified_range.end_line_exclusive() as isize
            - self.original_range.end_line_exclusive() as isize
    }

    /// Shift the original range by `delta` lines.
    pub fn add_original_delta(&self, delta: isize) -> LineRangeMapping {
        LineRangeMapping::new(self.original_range.delta(delta), self.modified_range)
    }

    /// Shift the modified range by `delta` lines.
    pub fn add_modified_delta(&self, delta: isize) -> LineRangeMapping {
        LineRangeMapping::new(self.original_range, self.modified_range.delta(delta))
    }
}

impl LineMapping for LineRangeMapping {
    fn line_mapping(&self) -> LineRangeMapping {
        *self
    }
}

/// A line mapping with nested character-level mappings and the snapshots it was computed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailedLineRangeMapping {
    original_range: LineRange,
    modified_range: LineRange,
    range_mappings: Vec<RangeMapping>,
    original_document: TextSnapshot,
    modified_document: TextSnapshot,
}

impl DetailedLineRangeMapping {
    /// Create a detailed mapping.
    ///
    /// Without inner mappings, a single mapping covering the whole lines on both sides is used.
    pub fn new(
        original_range: LineRange,
        original_document: TextSnapshot,
        modified_range: LineRange,
        modified_document: TextSnapshot,
        range_mappings: Option<Vec<RangeMapping>>,
    ) -> Self {
        let range_mappings = range_mappings.unwrap_or_else(|| {
            vec![RangeMapping::new(
                original_range.to_char_range(&original_document),
                modified_range.to_char_range(&modified_document),
            )]
        });
        Self {
            original_range,
            modified_range,
            range_mappings,
            original_document,
            modified_document,
        }
    }

    /// Lines in the original document.
    pub fn original_range(&self) -> LineRange {
        self.original_range
    }

    /// Lines in the modified document.
    pub fn modified_range(&self) -> LineRange {
        self.modified_range
    }

    /// Character-level mappings inside this line mapping.
    pub fn range_mappings(&self) -> &[RangeMapping] {
        &self.range_mappings
    }

    /// Snapshot of the original document.
    pub fn original_document(&self) -> &TextSnapshot {
        &self.original_document
    }

    /// Snapshot of the modified document.
    pub fn modified_document(&self) -> &TextSnapshot {
        &self.modified_document
    }

    /// The modified lines this mapping replaces the original lines with.
    pub fn modified_lines(&self) -> Vec<String> {
        self.modified_range.get_lines(&self.modified_document)
    }

    /// This mapping as an edit of the original document.
    pub fn line_edit(&self) -> LineRangeEdit {
        LineRangeEdit::new(self.original_range, self.modified_lines())
    }

    /// Swap the original and modified roles.
    pub fn reverse(&self) -> DetailedLineRangeMapping {
        DetailedLineRangeMapping {
            original_range: self.modified_range,
            modified_range: self.original_range,
            range_mappings: self.range_mappings.iter().map(RangeMapping::reverse).collect(),
            original_document: self.modified_document.clone(),
            modified_document: self.original_document.clone(),
        }
    }
}

impl LineMapping for DetailedLineRangeMapping {
    fn line_mapping(&self) -> LineRangeMapping {
        LineRangeMapping::new(self.original_range, self.modified_range)
    }
}

/// An ordered sequence of line mappings forming a monotonic projection between two documents.
///
/// Invariant: mappings are strictly ordered and non-overlapping on both sides, and the gap
/// between adjacent mappings is the same on both sides. Lines between mappings project by
/// a constant offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentLineRangeMap {
    mappings: Vec<LineRangeMapping>,
}

impl DocumentLineRangeMap {
    /// Create a map.
    ///
    /// # Panics
    ///
    /// Panics if the mappings violate the ordering/gap invariant.
    pub fn new(mappings: Vec<LineRangeMapping>) -> Self {
        for pair in mappings.windows(2) {
            let (m1, m2) = (&pair[0], &pair[1]);
            let ordered = m1.original_range.is_before(&m2.original_range)
                && m1.modified_range.is_before(&m2.modified_range);
            assert!(
                ordered
                    && m2.original_range.start_line() - m1.original_range.end_line_exclusive()
                        == m2.modified_range.start_line() - m1.modified_range.end_line_exclusive(),
                "malformed line range map: {m1:?} followed by {m2:?}"
            );
        }
        Self { mappings }
    }

    /// Build a map from mappings that only carry line ranges of interest.
    pub fn from_mappings<T: LineMapping>(mappings: &[T]) -> Self {
        Self::new(mappings.iter().map(LineMapping::line_mapping).collect())
    }

    /// Build a map between two documents that were both derived from the same original.
    ///
    /// `original_to_a` and `original_to_b` share the original coordinate space; the result maps
    /// `a` coordinates to `b` coordinates.
    pub fn between_modified_sides<T: LineMapping + Clone>(
        original_to_a: &[T],
        original_to_b: &[T],
    ) -> Self {
        let alignments = MappingAlignment::compute(original_to_a, original_to_b);
        Self::new(
            alignments
                .iter()
                .map(|alignment| {
                    LineRangeMapping::new(alignment.side1_range, alignment.side2_range)
                })
                .collect(),
        )
    }

    /// The mappings of this map.
    pub fn mappings(&self) -> &[LineRangeMapping] {
        &self.mappings
    }

    /// Project a single original line.
    ///
    /// Returns the mapping containing the line, or a single-line identity-offset mapping for a
    /// line between mappings.
    pub fn project_line(&self, line: usize) -> LineRangeMapping {
        let index = self
            .mappings
            .partition_point(|m| m.original_range.start_line() <= line);
        let Some(last_before) = index.checked_sub(1).map(|i| &self.mappings[i]) else {
            return LineRangeMapping::new(LineRange::new(line, 1), LineRange::new(line, 1));
        };

        if last_before.original_range.contains_line(line) {
            return *last_before;
        }

        let projected = line as isize + last_before.resulting_delta();
        LineRangeMapping::new(
            LineRange::new(line, 1),
            LineRange::new(projected as usize, 1),
        )
    }

    /// Project an original line range (union of the projections of its first and last lines).
    pub fn project_range(&self, range: LineRange) -> LineRangeMapping {
        let start = self.project_line(range.start_line());
        if range.line_count() <= 1 {
            return start;
        }
        let end = self.project_line(range.end_line_exclusive() - 1);
        LineRangeMapping::join([&start, &end]).unwrap_or(start)
    }

    /// The inverse map (modified to original).
    pub fn reverse(&self) -> DocumentLineRangeMap {
        DocumentLineRangeMap {
            mappings: self.mappings.iter().map(LineRangeMapping::reverse).collect(),
        }
    }
}

/// An ordered sequence of character mappings forming a monotonic projection between two
/// documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRangeMap {
    mappings: Vec<RangeMapping>,
}

impl DocumentRangeMap {
    /// Create a map.
    ///
    /// # Panics
    ///
    /// Panics if the mappings are not ordered and non-overlapping on both sides.
    pub fn new(mappings: Vec<RangeMapping>) -> Self {
        for pair in mappings.windows(2) {
            let (m1, m2) = (&pair[0], &pair[1]);
            assert!(
                m1.original_range.is_before(&m2.original_range)
                    && m1.modified_range.is_before(&m2.modified_range),
                "malformed range map: {m1:?} followed by {m2:?}"
            );
        }
        Self { mappings }
    }

    /// Collect the character mappings of detailed line mappings into one map.
    pub fn from_detailed(mappings: &[DetailedLineRangeMapping]) -> Self {
        Self::new(
            mappings
                .iter()
                .flat_map(|m| m.range_mappings().iter().copied())
                .collect(),
        )
    }

    /// The mappings of this map.
    pub fn mappings(&self) -> &[RangeMapping] {
        &self.mappings
    }

    /// Project a position.
    ///
    /// Finds the last mapping starting at or before `position`. A position inside that mapping
    /// projects to the mapping itself; a position after it projects by the offset between the
    /// mapping's end points. Positions before every mapping project to themselves.
    pub fn project_position(&self, position: Position) -> RangeMapping {
        let index = self
            .mappings
            .partition_point(|m| m.original_range.start <= position);
        let Some(last_before) = index.checked_sub(1).map(|i| &self.mappings[i]) else {
            return RangeMapping::new(
                CharRange::collapsed(position),
                CharRange::collapsed(position),
            );
        };

        if last_before.original_range.contains_position(position) {
            return *last_before;
        }

        let distance = TextLength::between(last_before.original_range.end, position);
        let projected = distance.add_to(last_before.modified_range.end);
        RangeMapping::new(
            CharRange::collapsed(position),
            CharRange::collapsed(projected),
        )
    }

    /// Project a range (union of the projections of both endpoints).
    pub fn project_range(&self, range: CharRange) -> RangeMapping {
        let start = self.project_position(range.start);
        let end = self.project_position(range.end);
        RangeMapping::new(
            start.original_range.plus_range(&end.original_range),
            start.modified_range.plus_range(&end.modified_range),
        )
    }

    /// The inverse map (modified to original).
    pub fn reverse(&self) -> DocumentRangeMap {
        DocumentRangeMap {
            mappings: self.mappings.iter().map(RangeMapping::reverse).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lrm(o_start: usize, o_count: usize, m_start: usize, m_count: usize) -> LineRangeMapping {
        LineRangeMapping::new(
            LineRange::new(o_start, o_count),
            LineRange::new(m_start, m_count),
        )
    }

    fn pos(line: usize, column: usize) -> Position {
        Position::new(line, column)
    }

    #[test]
    fn test_extend_original_range_grows_both_sides() {
        let mapping = lrm(4, 1, 6, 3);
        let extended = mapping.extend_original_range(LineRange::new(3, 3));
        assert_eq!(extended, lrm(3, 3, 5, 5));
    }

    #[test]
    fn test_join_mappings() {
        let joined = LineRangeMapping::join(&[lrm(1, 1, 1, 2), lrm(5, 0, 6, 1)]);
        assert_eq!(joined, Some(lrm(1, 4, 1, 6)));
        assert_eq!(LineRangeMapping::join(&[]), None);
    }

    #[test]
    fn test_project_line_between_and_inside_mappings() {
        // Two lines inserted after line 1, line 5 replaced by three lines.
        let map = DocumentLineRangeMap::new(vec![lrm(2, 0, 2, 2), lrm(5, 1, 7, 3)]);

        assert_eq!(map.project_line(0), lrm(0, 1, 0, 1));
        assert_eq!(map.project_line(3), lrm(3, 1, 5, 1));
        assert_eq!(map.project_line(5), lrm(5, 1, 7, 3));
        assert_eq!(map.project_line(8), lrm(8, 1, 12, 1));
    }

    #[test]
    #[should_panic]
    fn test_inconsistent_gaps_are_rejected() {
        DocumentLineRangeMap::new(vec![lrm(0, 1, 0, 1), lrm(3, 1, 5, 1)]);
    }

    #[test]
    fn test_reverse_twice_is_identity() {
        let map = DocumentLineRangeMap::new(vec![lrm(2, 0, 2, 2), lrm(5, 1, 7, 3)]);
        assert_eq!(map.reverse().reverse(), map);
        assert_eq!(map.reverse().project_line(12), lrm(12, 1, 8, 1));
    }

    #[test]
    fn test_project_position_offsets_after_mapping() {
        // "abc" -> "aXYZc" on line 0.
        let map = DocumentRangeMap::new(vec![RangeMapping::new(
            CharRange::new(pos(0, 1), pos(0, 2)),
            CharRange::new(pos(0, 1), pos(0, 4)),
        )]);

        let before = map.project_position(pos(0, 0));
        assert_eq!(before.modified_range, CharRange::collapsed(pos(0, 0)));

        let inside = map.project_position(pos(0, 1));
        assert_eq!(inside.modified_range, CharRange::new(pos(0, 1), pos(0, 4)));

        let after = map.project_position(pos(0, 3));
        assert_eq!(after.modified_range, CharRange::collapsed(pos(0, 5)));

        let next_line = map.project_position(pos(2, 7));
        assert_eq!(next_line.modified_range, CharRange::collapsed(pos(2, 7)));
    }

    #[test]
    fn test_project_range_is_union_of_endpoints() {
        let map = DocumentRangeMap::new(vec![RangeMapping::new(
            CharRange::new(pos(1, 0), pos(2, 0)),
            CharRange::new(pos(1, 0), pos(1, 0)),
        )]);
        let projected = map.project_range(CharRange::new(pos(0, 2), pos(3, 1)));
        assert_eq!(projected.modified_range, CharRange::new(pos(0, 2), pos(2, 1)));
    }

    #[test]
    fn test_detailed_mapping_defaults_to_whole_lines() {
        let original = TextSnapshot::from_text("a\nb\nc");
        let modified = TextSnapshot::from_text("a\nB\nc");
        let mapping = DetailedLineRangeMapping::new(
            LineRange::new(1, 1),
            original,
            LineRange::new(1, 1),
            modified,
            None,
        );
        assert_eq!(
            mapping.range_mappings(),
            &[RangeMapping::new(
                CharRange::new(pos(1, 0), pos(2, 0)),
                CharRange::new(pos(1, 0), pos(2, 0)),
            )]
        );
        assert_eq!(mapping.modified_lines(), vec!["B"]);
        assert_eq!(mapping.reverse().modified_lines(), vec!["b"]);
    }
}
