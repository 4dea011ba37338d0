//! Three-way alignment of two change lists that share a base coordinate space.
//!
//! Both inputs are ordered by their base (original) start line. They are merged into one stream,
//! and touching changes are grouped into a single aligned region. For a side without a change in
//! a group, the shared base range is projected through that side's running line delta.

use crate::line_range::LineRange;
use crate::range_mapping::LineRangeMapping;

/// Anything that carries a line-level mapping from a base document to a modified document.
pub trait LineMapping {
    /// The line-level mapping.
    fn line_mapping(&self) -> LineRangeMapping;
}

/// One aligned region spanning the base document and both modified sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingAlignment<T> {
    /// Region in the base document.
    pub base_range: LineRange,
    /// Corresponding region in side 1.
    pub side1_range: LineRange,
    /// Side 1 changes inside the region (may be empty).
    pub side1_changes: Vec<T>,
    /// Corresponding region in side 2.
    pub side2_range: LineRange,
    /// Side 2 changes inside the region (may be empty).
    pub side2_changes: Vec<T>,
}

impl<T: LineMapping + Clone> MappingAlignment<T> {
    /// Align two base-ordered change lists.
    ///
    /// Changes are sorted stably by base start line, so side 1 sorts before side 2 on equal
    /// starts. Every input change ends up in exactly one alignment. Two empty inputs produce no
    /// alignments.
    pub fn compute(side1_changes: &[T], side2_changes: &[T]) -> Vec<MappingAlignment<T>> {
        let mut combined: Vec<(usize, &T, LineRangeMapping)> = side1_changes
            .iter()
            .map(|change| (0, change, change.line_mapping()))
            .chain(
                side2_changes
                    .iter()
                    .map(|change| (1, change, change.line_mapping())),
            )
            .collect();
        combined.sort_by_key(|(_, _, mapping)| mapping.original_range.start_line());

        let mut builder = AlignmentBuilder::default();
        let mut current: Option<LineRange> = None;

        for (side, change, mapping) in combined {
            let range = mapping.original_range;
            if let Some(acc) = current
                && !acc.touches(&range)
            {
                builder.flush(acc);
                current = None;
            }

            builder.deltas[side] = mapping.resulting_delta();
            builder.changes[side].push((change.clone(), mapping));
            current = Some(match current {
                Some(acc) => acc.join(&range),
                None => range,
            });
        }

        if let Some(acc) = current {
            builder.flush(acc);
        }
        builder.alignments
    }
}

struct AlignmentBuilder<T> {
    changes: [Vec<(T, LineRangeMapping)>; 2],
    deltas: [isize; 2],
    alignments: Vec<MappingAlignment<T>>,
}

impl<T> Default for AlignmentBuilder<T> {
    fn default() -> Self {
        Self {
            changes: [Vec::new(), Vec::new()],
            deltas: [0, 0],
            alignments: Vec::new(),
        }
    }
}

impl<T> AlignmentBuilder<T> {
    fn flush(&mut self, base_range: LineRange) {
        let [side1, side2] = std::array::from_fn(|side| {
            let pending = std::mem::take(&mut self.changes[side]);
            let joined = LineRangeMapping::join(pending.iter().map(|(_, mapping)| mapping))
                .unwrap_or_else(|| {
                    LineRangeMapping::new(base_range, base_range.delta(self.deltas[side]))
                });
            let range = joined.extend_original_range(base_range).modified_range;
            let changes: Vec<T> = pending.into_iter().map(|(change, _)| change).collect();
            (range, changes)
        });

        self.alignments.push(MappingAlignment {
            base_range,
            side1_range: side1.0,
            side1_changes: side1.1,
            side2_range: side2.0,
            side2_changes: side2.1,
        });
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

    #[test]
    fn test_no_changes_no_alignments() {
        assert!(MappingAlignment::<LineRangeMapping>::compute(&[], &[]).is_empty());
    }

    #[test]
    fn test_one_sided_change_projects_other_side() {
        // side1 replaces base line 1 with two lines; side2 untouched.
        let alignments = MappingAlignment::compute(&[lrm(1, 1, 1, 2)], &[]);
        assert_eq!(
            alignments,
            vec![MappingAlignment {
                base_range: LineRange::new(1, 1),
                side1_range: LineRange::new(1, 2),
                side1_changes: vec![lrm(1, 1, 1, 2)],
                side2_range: LineRange::new(1, 1),
                side2_changes: vec![],
            }]
        );
    }

    #[test]
    fn test_touching_changes_are_grouped_and_extended() {
        // side1: base [2,4) -> [2,3); side2: base [3,5) -> [3,6).
        let alignments = MappingAlignment::compute(&[lrm(2, 2, 2, 1)], &[lrm(3, 2, 3, 3)]);
        assert_eq!(alignments.len(), 1);
        let alignment = &alignments[0];
        assert_eq!(alignment.base_range, LineRange::new(2, 3));
        // side1 grows by the base line 4 it did not touch.
        assert_eq!(alignment.side1_range, LineRange::new(2, 2));
        // side2 grows by the base line 2 it did not touch.
        assert_eq!(alignment.side2_range, LineRange::new(2, 4));
    }

    #[test]
    fn test_running_delta_shifts_later_regions() {
        // side1 inserts two lines at base line 0; side2 changes base line 5.
        let alignments = MappingAlignment::compute(&[lrm(0, 0, 0, 2)], &[lrm(5, 1, 5, 1)]);
        assert_eq!(alignments.len(), 2);
        assert_eq!(alignments[1].base_range, LineRange::new(5, 1));
        assert_eq!(alignments[1].side1_range, LineRange::new(7, 1));
        assert_eq!(alignments[1].side2_range, LineRange::new(5, 1));
    }

    #[test]
    fn test_equal_starts_keep_side1_first() {
        let alignments = MappingAlignment::compute(&[lrm(1, 1, 1, 1)], &[lrm(1, 1, 1, 3)]);
        assert_eq!(alignments.len(), 1);
        assert_eq!(alignments[0].side1_changes, vec![lrm(1, 1, 1, 1)]);
        assert_eq!(alignments[0].side2_changes, vec![lrm(1, 1, 1, 3)]);
        assert_eq!(alignments[0].side2_range, LineRange::new(1, 3));
    }
}
