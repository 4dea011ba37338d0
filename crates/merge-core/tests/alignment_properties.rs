//! Property-based tests for change alignment and line projection.
//!
//! 1. Every input change lands in exactly one aligned region, inside that region's ranges
//! 2. Aligned regions are ordered and separated in the base document
//! 3. Reversing a line map twice is the identity
//! 4. Lines between changes project there and back unchanged

use merge_core::{DocumentLineRangeMap, LineRange, LineRangeMapping, MappingAlignment};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

/// A well-formed change list: ordered, non-touching, equal gaps on both sides.
fn changes_strategy() -> impl Strategy<Value = Vec<LineRangeMapping>> {
    prop::collection::vec((1usize..4, 0usize..3, 0usize..3), 0..8).prop_flat_map(|parts| {
        (0usize..3).prop_map(move |lead| {
            let (mut original, mut modified) = (lead, lead);
            let mut changes = Vec::with_capacity(parts.len());
            for (index, (gap, original_len, modified_len)) in parts.iter().copied().enumerate() {
                if index > 0 {
                    original += gap;
                    modified += gap;
                }
                let original_len = if original_len == 0 && modified_len == 0 {
                    1
                } else {
                    original_len
                };
                changes.push(LineRangeMapping::new(
                    LineRange::new(original, original_len),
                    LineRange::new(modified, modified_len),
                ));
                original += original_len;
                modified += modified_len;
            }
            changes
        })
    })
}

fn occurrences(
    alignments: &[MappingAlignment<LineRangeMapping>],
    change: &LineRangeMapping,
) -> usize {
    alignments
        .iter()
        .filter(|alignment| {
            alignment.side1_changes.contains(change) || alignment.side2_changes.contains(change)
        })
        .count()
}

// ═══════════════════════════════════════════════════════════════════════
// 1-2. Alignment
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn every_change_is_aligned_exactly_once(
        side1 in changes_strategy(),
        side2 in changes_strategy(),
    ) {
        let alignments = MappingAlignment::compute(&side1, &side2);

        for change in side1.iter().chain(side2.iter()) {
            prop_assert_eq!(occurrences(&alignments, change), 1);
        }
        for alignment in &alignments {
            prop_assert!(
                !alignment.side1_changes.is_empty() || !alignment.side2_changes.is_empty()
            );
            for change in &alignment.side1_changes {
                prop_assert!(alignment.base_range.contains_range(&change.original_range));
                prop_assert!(alignment.side1_range.contains_range(&change.modified_range));
            }
            for change in &alignment.side2_changes {
                prop_assert!(alignment.base_range.contains_range(&change.original_range));
                prop_assert!(alignment.side2_range.contains_range(&change.modified_range));
            }
        }
    }

    #[test]
    fn aligned_regions_are_separated(
        side1 in changes_strategy(),
        side2 in changes_strategy(),
    ) {
        let alignments = MappingAlignment::compute(&side1, &side2);
        for pair in alignments.windows(2) {
            prop_assert!(
                pair[0].base_range.end_line_exclusive() < pair[1].base_range.start_line()
            );
            prop_assert!(pair[0].side1_range.is_before(&pair[1].side1_range));
            prop_assert!(pair[0].side2_range.is_before(&pair[1].side2_range));
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 3-4. Projection
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn double_reverse_is_identity(changes in changes_strategy()) {
        let map = DocumentLineRangeMap::new(changes);
        prop_assert_eq!(map.reverse().reverse(), map);
    }

    #[test]
    fn unchanged_lines_round_trip(changes in changes_strategy(), line in 0usize..40) {
        prop_assume!(changes.iter().all(|change| !change.original_range.contains_line(line)));
        let map = DocumentLineRangeMap::new(changes);

        let projected = map.project_line(line).modified_range;
        prop_assert_eq!(projected.line_count(), 1);
        let back = map.reverse().project_line(projected.start_line()).modified_range;
        prop_assert_eq!(back, LineRange::new(line, 1));
    }
}
