//! Aligned merge regions and their synthesized resolutions.

use crate::line_range::LineRange;
use crate::mapping_alignment::MappingAlignment;
use crate::position::{CharRange, Position};
use crate::range_editing::{LineRangeEdit, RangeEdit};
use crate::range_mapping::DetailedLineRangeMapping;
use crate::text::{TextSnapshot, split_lines};
use std::cell::OnceCell;
use std::fmt;

/// Identifier of a merge range.
///
/// Ids survive re-derivation of the merge range list for ranges that did not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MergeRangeId(pub(crate) u64);

impl fmt::Display for MergeRangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the two modified sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeSide {
    /// The first modified document.
    Side1,
    /// The second modified document.
    Side2,
}

impl MergeSide {
    /// The opposite side.
    pub fn other(self) -> MergeSide {
        match self {
            MergeSide::Side1 => MergeSide::Side2,
            MergeSide::Side2 => MergeSide::Side1,
        }
    }

    fn index(self) -> usize {
        match self {
            MergeSide::Side1 => 0,
            MergeSide::Side2 => 1,
        }
    }
}

/// Which side(s) a merge range resolution takes, and how two sides are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeRangeAcceptedState {
    /// Keep the base lines.
    Base,
    /// Take side 1.
    Side1,
    /// Take side 2.
    Side2,
    /// Side 1 lines followed by side 2 lines.
    Side1Side2,
    /// Side 2 lines followed by side 1 lines.
    Side2Side1,
    /// Character-level interleaving of both sides, side 1 first on ties.
    Side1Side2Smart,
    /// Character-level interleaving of both sides, side 2 first on ties.
    Side2Side1Smart,
}

impl MergeRangeAcceptedState {
    /// Every state, in the order result recognition tries them.
    pub const RECOGNITION_ORDER: [MergeRangeAcceptedState; 7] = [
        Self::Base,
        Self::Side1,
        Self::Side2,
        Self::Side1Side2Smart,
        Self::Side2Side1Smart,
        Self::Side1Side2,
        Self::Side2Side1,
    ];

    /// Returns `true` if the state includes the given side's changes.
    pub fn includes(self, side: MergeSide) -> bool {
        match self {
            Self::Base => false,
            Self::Side1 => side == MergeSide::Side1,
            Self::Side2 => side == MergeSide::Side2,
            _ => true,
        }
    }

    /// Returns `true` for the character-level combination states.
    pub fn is_smart(self) -> bool {
        matches!(self, Self::Side1Side2Smart | Self::Side2Side1Smart)
    }

    /// For two-sided states, the side that comes first.
    pub fn first_side(self) -> Option<MergeSide> {
        match self {
            Self::Side1Side2 | Self::Side1Side2Smart => Some(MergeSide::Side1),
            Self::Side2Side1 | Self::Side2Side1Smart => Some(MergeSide::Side2),
            _ => None,
        }
    }
}

impl fmt::Display for MergeRangeAcceptedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The resolution a merge range currently holds in the result document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeRangeResultState {
    /// The result matches a synthesized resolution.
    Accepted(MergeRangeAcceptedState),
    /// The result was edited by hand and matches no synthesized resolution.
    Unrecognized,
}

impl Default for MergeRangeResultState {
    fn default() -> Self {
        Self::Accepted(MergeRangeAcceptedState::Base)
    }
}

/// One aligned region of the base document with the changes both sides made to it.
///
/// Invariant: at least one side has changes.
#[derive(Debug, Clone)]
pub struct MergeRange {
    id: MergeRangeId,
    base_range: LineRange,
    side_ranges: [LineRange; 2],
    side_changes: [Vec<DetailedLineRangeMapping>; 2],
    base: TextSnapshot,
    sides: [TextSnapshot; 2],
    is_equal_change: bool,
    smart_combinations: [OnceCell<Option<LineRangeEdit>>; 2],
    dumb_combinations: [OnceCell<LineRangeEdit>; 2],
}

impl MergeRange {
    /// Derive merge ranges from the base-to-side changes of both sides.
    ///
    /// Ranges get positional ids; callers that track ranges over time reassign them.
    pub fn compute_merge_ranges(
        side1_changes: &[DetailedLineRangeMapping],
        side2_changes: &[DetailedLineRangeMapping],
        base: &TextSnapshot,
        side1: &TextSnapshot,
        side2: &TextSnapshot,
    ) -> Vec<MergeRange> {
        MappingAlignment::compute(side1_changes, side2_changes)
            .into_iter()
            .enumerate()
            .map(|(index, alignment)| {
                MergeRange::new(
                    MergeRangeId(index as u64),
                    alignment,
                    base.clone(),
                    [side1.clone(), side2.clone()],
                )
            })
            .collect()
    }

    fn new(
        id: MergeRangeId,
        alignment: MappingAlignment<DetailedLineRangeMapping>,
        base: TextSnapshot,
        sides: [TextSnapshot; 2],
    ) -> Self {
        assert!(
            !alignment.side1_changes.is_empty() || !alignment.side2_changes.is_empty(),
            "merge range without changes at {}",
            alignment.base_range
        );
        let is_equal_change = same_edits(&alignment.side1_changes, &alignment.side2_changes);
        Self {
            id,
            base_range: alignment.base_range,
            side_ranges: [alignment.side1_range, alignment.side2_range],
            side_changes: [alignment.side1_changes, alignment.side2_changes],
            base,
            sides,
            is_equal_change,
            smart_combinations: Default::default(),
            dumb_combinations: Default::default(),
        }
    }

    /// Identifier of this range.
    pub fn id(&self) -> MergeRangeId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: MergeRangeId) {
        self.id = id;
    }

    /// Region in the base document.
    pub fn base_range(&self) -> LineRange {
        self.base_range
    }

    /// Region in the given side.
    pub fn side_range(&self, side: MergeSide) -> LineRange {
        self.side_ranges[side.index()]
    }

    /// Changes the given side made inside this region.
    pub fn side_changes(&self, side: MergeSide) -> &[DetailedLineRangeMapping] {
        &self.side_changes[side.index()]
    }

    /// Returns `true` if both sides made exactly the same line edits.
    pub fn is_equal_change(&self) -> bool {
        self.is_equal_change
    }

    /// Returns `true` if both sides changed the region differently.
    pub fn is_conflicting(&self) -> bool {
        !self.side_changes[0].is_empty()
            && !self.side_changes[1].is_empty()
            && !self.is_equal_change
    }

    /// Base lines of the region.
    pub fn base_lines(&self) -> Vec<String> {
        self.base_range.get_lines(&self.base)
    }

    /// The given side's lines of the region.
    pub fn side_lines(&self, side: MergeSide) -> Vec<String> {
        self.side_range(side).get_lines(&self.sides[side.index()])
    }

    /// The edit of the base region that produces `state`.
    ///
    /// Smart states fall back to the dumb combination when the sides cannot be interleaved.
    pub fn get_base_range_edit(&self, state: MergeRangeAcceptedState) -> LineRangeEdit {
        match state {
            MergeRangeAcceptedState::Base => LineRangeEdit::new(self.base_range, self.base_lines()),
            MergeRangeAcceptedState::Side1 => {
                LineRangeEdit::new(self.base_range, self.side_lines(MergeSide::Side1))
            }
            MergeRangeAcceptedState::Side2 => {
                LineRangeEdit::new(self.base_range, self.side_lines(MergeSide::Side2))
            }
            combined => {
                let first_side = combined.first_side().unwrap_or(MergeSide::Side1);
                if combined.is_smart()
                    && let Some(edit) = self.smart_combine(first_side)
                {
                    return edit;
                }
                self.dumb_combine(first_side)
            }
        }
    }

    /// Interleave the character-level edits of both sides over the base text.
    ///
    /// Edits are replayed in base order, `first_side` first on ties. Returns `None` if edits
    /// overlap or the result does not end on the region's line boundaries.
    pub fn smart_combine(&self, first_side: MergeSide) -> Option<LineRangeEdit> {
        self.smart_combinations[first_side.index()]
            .get_or_init(|| self.compute_smart_combination(first_side))
            .clone()
    }

    /// All lines of `first_side` followed by all lines of the other side.
    pub fn dumb_combine(&self, first_side: MergeSide) -> LineRangeEdit {
        self.dumb_combinations[first_side.index()]
            .get_or_init(|| {
                let mut lines = self.side_lines(first_side);
                lines.extend(self.side_lines(first_side.other()));
                LineRangeEdit::new(self.base_range, lines)
            })
            .clone()
    }

    /// Returns `true` if the region conflicts and smart combination starting with `side`
    /// succeeds.
    pub fn can_be_smart_combined(&self, side: MergeSide) -> bool {
        self.is_conflicting() && self.smart_combine(side).is_some()
    }

    /// Returns `true` if the two smart combination orders disagree (or either fails).
    pub fn is_smart_combination_order_relevant(&self) -> bool {
        match (
            self.smart_combine(MergeSide::Side1),
            self.smart_combine(MergeSide::Side2),
        ) {
            (Some(first), Some(second)) => first != second,
            _ => true,
        }
    }

    /// Returns `true` if `other` covers the same base region with the same edits.
    pub(crate) fn is_same_region(&self, other: &MergeRange) -> bool {
        self.base_range == other.base_range
            && same_edits(&self.side_changes[0], &other.side_changes[0])
            && same_edits(&self.side_changes[1], &other.side_changes[1])
    }

    fn compute_smart_combination(&self, first_side: MergeSide) -> Option<LineRangeEdit> {
        let sides = [MergeSide::Side1, MergeSide::Side2];
        let mut tagged: Vec<(CharRange, bool, &TextSnapshot, CharRange)> = sides
            .into_iter()
            .flat_map(|side| {
                let snapshot = &self.sides[side.index()];
                self.side_changes(side).iter().flat_map(move |change| {
                    change.range_mappings().iter().map(move |mapping| {
                        (
                            mapping.original_range,
                            side != first_side,
                            snapshot,
                            mapping.modified_range,
                        )
                    })
                })
            })
            .collect();
        tagged.sort_by_key(|(range, later, _, _)| (range.start, range.end, *later));

        let edits: Vec<RangeEdit> = tagged
            .into_iter()
            .map(|(range, _, snapshot, modified)| {
                RangeEdit::new(range, snapshot.value_in_range(modified))
            })
            .collect();
        edits_to_line_range_edit(self.base_range, &edits, &self.base)
    }
}

/// Splice sorted character edits over the base text of `range`.
///
/// The splice starts at the end of the line before `range` (or the document start) and ends at
/// the start of the line after it (or the document end), so a well-formed result begins and ends
/// with a line break that is stripped again.
fn edits_to_line_range_edit(
    range: LineRange,
    sorted_edits: &[RangeEdit],
    base: &TextSnapshot,
) -> Option<LineRangeEdit> {
    let line_count = base.line_count();
    let starts_line_before = range.start_line() > 0;
    let mut current = if starts_line_before {
        let previous = range.start_line() - 1;
        Position::new(previous, base.line_length(previous))
    } else {
        Position::new(range.start_line(), 0)
    };

    let mut text = String::new();
    for edit in sorted_edits {
        let edit_start = edit.range.start;
        if edit_start < current {
            return None;
        }
        text.push_str(&base.value_in_range(CharRange::new(current, edit_start)));
        text.push_str(&edit.new_text);
        current = edit.range.end;
    }

    let ends_line_after = range.end_line_exclusive() < line_count;
    let end = if ends_line_after {
        Position::new(range.end_line_exclusive(), 0)
    } else {
        let last = line_count - 1;
        Position::new(last, base.line_length(last))
    };
    if end < current {
        return None;
    }
    text.push_str(&base.value_in_range(CharRange::new(current, end)));

    let mut lines = split_lines(&text);
    if starts_line_before {
        if lines.first().is_none_or(|line| !line.is_empty()) {
            return None;
        }
        lines.remove(0);
    }
    if ends_line_after {
        if lines.last().is_none_or(|line| !line.is_empty()) {
            return None;
        }
        lines.pop();
    }
    Some(LineRangeEdit::new(range, lines))
}

fn same_edits(a: &[DetailedLineRangeMapping], b: &[DetailedLineRangeMapping]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.line_edit() == y.line_edit())
}
