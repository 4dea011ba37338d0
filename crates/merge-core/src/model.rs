//! The three-way merge model.
//!
//! [`MergeEditorModel`] observes four documents (base, side 1, side 2, result) and keeps three
//! live diffs against the base. From the two side diffs it derives [`MergeRange`]s; from the
//! result diff it recognizes which resolution each range currently holds in the result
//! document. Resolutions are written back as single undoable edits.
//!
//! The model is single-threaded and pull based. Hosts call [`MergeEditorModel::update`] after
//! document changes (and whenever an asynchronous diff may have finished); derived values are
//! recomputed lazily on read, keyed by the revisions of the live diffs they depend on.
//!
//! # Handled state
//!
//! Every merge range carries a sticky *handled* flag. A range that has not been pinned yet takes
//! `result_state != Base` the first time its result state is computed. Applying a resolution,
//! or editing the result inside an unhandled range, pins it as handled. Those pins are recorded
//! in an [`AttachedHistory`] so that undoing the edit un-handles the range again, and redoing
//! it re-handles it.

use crate::cache::Derived;
use crate::delta::{ContentChangeEvent, ContentChangeReceiver};
use crate::document::{SharedDocument, TextDocument};
use crate::error::MergeError;
use crate::history::{AttachedHistory, HistoryReplay};
use crate::line_range::LineRange;
use crate::live_diff::{DiffComputer, LiveDiff, LiveDiffState};
use crate::merge_range::{
    MergeRange, MergeRangeAcceptedState, MergeRangeId, MergeRangeResultState, MergeSide,
};
use crate::position::CharRange;
use crate::range_editing::LineRangeEdit;
use crate::range_mapping::{
    DetailedLineRangeMapping, DocumentLineRangeMap, DocumentRangeMap, LineRangeMapping,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

/// The four documents of a merge.
#[derive(Debug, Clone)]
pub struct MergeDocuments {
    /// Common ancestor.
    pub base: SharedDocument,
    /// First modified document.
    pub side1: SharedDocument,
    /// Second modified document.
    pub side2: SharedDocument,
    /// Merge output, edited by the model.
    pub result: SharedDocument,
}

/// Role of a document in a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentRole {
    /// Common ancestor.
    Base,
    /// First modified document.
    Side1,
    /// Second modified document.
    Side2,
    /// Merge output.
    Result,
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentRole::Base => "base",
            DocumentRole::Side1 => "side1",
            DocumentRole::Side2 => "side2",
            DocumentRole::Result => "result",
        };
        f.write_str(name)
    }
}

/// Model configuration.
#[derive(Debug, Clone, Default)]
pub struct MergeEditorOptions {
    /// Rewrite the result document from the auto-merged content once the side diffs are ready.
    pub reset_result: bool,
}

/// Combined state of several live diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffComputingState {
    /// At least one diff has not produced a result yet.
    Initializing,
    /// Every diff matches the current documents.
    UpToDate,
    /// At least one diff is being recomputed.
    Updating,
    /// At least one diff failed; its previous result is still in use.
    Error,
}

impl DiffComputingState {
    fn combine(states: &[LiveDiffState]) -> Self {
        if states.contains(&LiveDiffState::Initializing) {
            Self::Initializing
        } else if states.contains(&LiveDiffState::Updating) {
            Self::Updating
        } else if states.contains(&LiveDiffState::Error) {
            Self::Error
        } else {
            Self::UpToDate
        }
    }
}

/// Per-range state owned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeRangeData {
    result_state: MergeRangeResultState,
    is_handled: bool,
    /// Once set, result state recomputation no longer touches `is_handled`.
    handled_settled: bool,
}

impl MergeRangeData {
    /// Resolution the result document currently holds for the range.
    pub fn result_state(&self) -> MergeRangeResultState {
        self.result_state
    }

    /// Whether the range counts as dealt with.
    pub fn is_handled(&self) -> bool {
        self.is_handled
    }
}

type DiffStamp = (u64, u64);

#[derive(Default)]
struct DerivedMaps {
    side1_to_result: Derived<DiffStamp, DocumentLineRangeMap>,
    result_to_side1: Derived<DiffStamp, DocumentLineRangeMap>,
    side2_to_result: Derived<DiffStamp, DocumentLineRangeMap>,
    result_to_side2: Derived<DiffStamp, DocumentLineRangeMap>,
    base_to_side1: Derived<u64, DocumentLineRangeMap>,
    side1_to_base: Derived<u64, DocumentLineRangeMap>,
    base_to_side2: Derived<u64, DocumentLineRangeMap>,
    side2_to_base: Derived<u64, DocumentLineRangeMap>,
    base_to_result: Derived<u64, DocumentLineRangeMap>,
    result_to_base: Derived<u64, DocumentLineRangeMap>,
    base_to_side1_chars: Derived<u64, DocumentRangeMap>,
    side1_to_base_chars: Derived<u64, DocumentRangeMap>,
    base_to_side2_chars: Derived<u64, DocumentRangeMap>,
    side2_to_base_chars: Derived<u64, DocumentRangeMap>,
    base_to_result_chars: Derived<u64, DocumentRangeMap>,
    result_to_base_chars: Derived<u64, DocumentRangeMap>,
}

/// Result of projecting one base line into the result document.
enum ProjectedLine {
    Line(usize),
    Change(LineRangeMapping),
}

/// The three-way merge model.
pub struct MergeEditorModel {
    base: Weak<RefCell<TextDocument>>,
    side1: Weak<RefCell<TextDocument>>,
    side2: Weak<RefCell<TextDocument>>,
    result: Weak<RefCell<TextDocument>>,
    result_events: ContentChangeReceiver,
    side1_diff: LiveDiff,
    side2_diff: LiveDiff,
    result_diff: LiveDiff,
    options: MergeEditorOptions,
    history: AttachedHistory<Vec<MergeRangeId>>,
    merge_ranges: Derived<DiffStamp, Vec<MergeRange>>,
    maps: DerivedMaps,
    next_range_id: Cell<u64>,
    range_data: HashMap<MergeRangeId, MergeRangeData>,
    synced_ranges: Option<Rc<Vec<MergeRange>>>,
    reset_done: bool,
    initialized: bool,
}

impl MergeEditorModel {
    /// Create a model over `documents` and bring it as far up to date as the diff computer
    /// allows.
    pub fn new(
        documents: &MergeDocuments,
        diff_computer: Rc<dyn DiffComputer>,
        options: MergeEditorOptions,
    ) -> Result<Self, MergeError> {
        let result_events = documents.result.borrow_mut().subscribe();
        let history = AttachedHistory::new(documents.result.borrow().alternative_version_id());

        let mut model = Self {
            base: Rc::downgrade(&documents.base),
            side1: Rc::downgrade(&documents.side1),
            side2: Rc::downgrade(&documents.side2),
            result: Rc::downgrade(&documents.result),
            result_events,
            side1_diff: LiveDiff::new(&documents.base, &documents.side1, diff_computer.clone()),
            side2_diff: LiveDiff::new(&documents.base, &documents.side2, diff_computer.clone()),
            result_diff: LiveDiff::new(&documents.base, &documents.result, diff_computer),
            options,
            history,
            merge_ranges: Derived::default(),
            maps: DerivedMaps::default(),
            next_range_id: Cell::new(0),
            range_data: HashMap::new(),
            synced_ranges: None,
            reset_done: false,
            initialized: false,
        };
        model.update()?;
        Ok(model)
    }

    /// Process document changes and finished diffs, then refresh per-range state.
    ///
    /// Result edits are handled first, against the maps that were valid before them. Then the
    /// live diffs are polled, range data is carried over to re-derived merge ranges, the
    /// configured initial reset runs once, and result states are recomputed if everything is up
    /// to date.
    pub fn update(&mut self) -> Result<(), MergeError> {
        for role in [
            DocumentRole::Base,
            DocumentRole::Side1,
            DocumentRole::Side2,
            DocumentRole::Result,
        ] {
            self.document(role)?;
        }

        self.process_result_events();
        self.side1_diff.poll();
        self.side2_diff.poll();
        self.result_diff.poll();
        self.sync_range_data();

        if self.options.reset_result
            && !self.reset_done
            && self.diff_computing_state_for_sides() == DiffComputingState::UpToDate
        {
            self.reset()?;
            self.reset_done = true;
            self.result_diff.poll();
        }

        if self.is_up_to_date() {
            self.recompute_result_states();
            if !self.options.reset_result || self.reset_done {
                self.initialized = true;
            }
        }
        Ok(())
    }

    /// Combined state of all three diffs.
    pub fn diff_computing_state(&self) -> DiffComputingState {
        DiffComputingState::combine(&[
            self.side1_diff.state(),
            self.side2_diff.state(),
            self.result_diff.state(),
        ])
    }

    /// Combined state of the two side diffs.
    pub fn diff_computing_state_for_sides(&self) -> DiffComputingState {
        DiffComputingState::combine(&[self.side1_diff.state(), self.side2_diff.state()])
    }

    /// Returns `true` if all three diffs match the current documents.
    pub fn is_up_to_date(&self) -> bool {
        self.diff_computing_state() == DiffComputingState::UpToDate
    }

    /// Returns `true` once the model has been up to date (and the configured reset has run).
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Base-to-side-1 changes.
    pub fn side1_changes(&self) -> &[DetailedLineRangeMapping] {
        self.side1_diff.changes()
    }

    /// Base-to-side-2 changes.
    pub fn side2_changes(&self) -> &[DetailedLineRangeMapping] {
        self.side2_diff.changes()
    }

    /// Base-to-result changes.
    pub fn result_changes(&self) -> &[DetailedLineRangeMapping] {
        self.result_diff.changes()
    }

    /// The merge ranges derived from the current side diffs.
    ///
    /// While the two side diffs were computed against different base versions, the previously
    /// derived ranges are kept.
    pub fn merge_ranges(&self) -> Rc<Vec<MergeRange>> {
        let stamp = (self.side1_diff.revision(), self.side2_diff.revision());
        self.merge_ranges.get(stamp, |previous| {
            let base1 = self.side1_diff.original_snapshot();
            let base2 = self.side2_diff.original_snapshot();
            if base1.version_id() != base2.version_id()
                && let Some(previous) = previous
            {
                trace!("side diffs disagree on the base version; keeping merge ranges");
                return Rc::clone(previous);
            }

            let mut ranges = MergeRange::compute_merge_ranges(
                self.side1_diff.changes(),
                self.side2_diff.changes(),
                base1,
                self.side1_diff.modified_snapshot(),
                self.side2_diff.modified_snapshot(),
            );
            let previous = previous.map(|ranges| ranges.as_slice()).unwrap_or(&[]);
            for range in &mut ranges {
                let id = previous
                    .iter()
                    .find(|old| old.is_same_region(range))
                    .map(MergeRange::id)
                    .unwrap_or_else(|| self.allocate_range_id());
                range.set_id(id);
            }
            debug!(count = ranges.len(), "merge ranges derived");
            Rc::new(ranges)
        })
    }

    /// Returns `true` if `id` names a current merge range.
    pub fn has_merge_range(&self, id: MergeRangeId) -> bool {
        self.range_data.contains_key(&id)
    }

    /// Per-range state of `id`.
    pub fn merge_range_data(&self, id: MergeRangeId) -> Result<MergeRangeData, MergeError> {
        self.range_data
            .get(&id)
            .copied()
            .ok_or(MergeError::UnknownMergeRange(id))
    }

    /// Resolution the result document currently holds for `id`.
    pub fn merge_range_result_state(
        &self,
        id: MergeRangeId,
    ) -> Result<MergeRangeResultState, MergeError> {
        Ok(self.merge_range_data(id)?.result_state)
    }

    /// Whether `id` counts as dealt with.
    pub fn is_merge_range_handled(&self, id: MergeRangeId) -> Result<bool, MergeError> {
        Ok(self.merge_range_data(id)?.is_handled)
    }

    /// Number of merge ranges that are not handled.
    pub fn unhandled_merge_ranges_count(&self) -> usize {
        self.range_data.values().filter(|data| !data.is_handled).count()
    }

    /// Ids of the merge ranges whose base range touches `base_range`.
    pub fn find_merge_ranges(&self, base_range: LineRange) -> Vec<MergeRangeId> {
        self.merge_ranges()
            .iter()
            .filter(|range| range.base_range().touches(&base_range))
            .map(MergeRange::id)
            .collect()
    }

    /// Lines of the result document that correspond to merge range `id`.
    pub fn line_range_in_result(&self, id: MergeRangeId) -> Result<LineRange, MergeError> {
        Ok(self.result_line_range_mapping(id)?.modified_range)
    }

    /// Mapping between the base region of `id` and its lines in the result document.
    ///
    /// Result changes that touch either end of the region widen it to cover the whole change on
    /// both sides.
    pub fn result_line_range_mapping(
        &self,
        id: MergeRangeId,
    ) -> Result<LineRangeMapping, MergeError> {
        self.with_range(id, |range| self.project_to_result(range.base_range()))
    }

    /// Project a character range from base to the given side.
    pub fn translate_base_range_to_side(&self, range: CharRange, side: MergeSide) -> CharRange {
        let map = match side {
            MergeSide::Side1 => self.base_to_side1_range_map(),
            MergeSide::Side2 => self.base_to_side2_range_map(),
        };
        map.project_range(range).modified_range
    }

    /// Project a character range from the given side to base.
    pub fn translate_side_range_to_base(&self, range: CharRange, side: MergeSide) -> CharRange {
        let map = match side {
            MergeSide::Side1 => self.side1_to_base_range_map(),
            MergeSide::Side2 => self.side2_to_base_range_map(),
        };
        map.project_range(range).modified_range
    }

    /// Project a character range from base to the result document.
    pub fn translate_base_range_to_result(&self, range: CharRange) -> CharRange {
        self.base_to_result_range_map()
            .project_range(range)
            .modified_range
    }

    /// Project a character range from the result document to base.
    pub fn translate_result_range_to_base(&self, range: CharRange) -> CharRange {
        self.result_to_base_range_map()
            .project_range(range)
            .modified_range
    }

    /// Write the resolution `state` of merge range `id` into the result document.
    ///
    /// The edit replaces the range's current projection in the result and is pushed between undo
    /// checkpoints as one undoable step. The range becomes handled; undoing the edit restores
    /// its previous handled value.
    ///
    /// # Errors
    ///
    /// - [`MergeError::NotUpToDate`] while any diff is not up to date.
    /// - [`MergeError::UnknownMergeRange`] for an id that names no current range.
    /// - [`MergeError::UnrecognizedResultState`] for a non-base state on a hand-edited range.
    /// - [`MergeError::ResultRangeMismatch`] if a result change spills past the range.
    pub fn apply_merge_range_accepted_state(
        &mut self,
        id: MergeRangeId,
        state: MergeRangeAcceptedState,
    ) -> Result<(), MergeError> {
        if !self.is_up_to_date() {
            return Err(MergeError::NotUpToDate);
        }
        let data = self.merge_range_data(id)?;
        if state != MergeRangeAcceptedState::Base
            && data.result_state == MergeRangeResultState::Unrecognized
        {
            return Err(MergeError::UnrecognizedResultState(id));
        }
        let result = self.document(DocumentRole::Result)?;
        self.process_result_events();

        let mapping = self.result_line_range_mapping(id)?;
        let new_lines = if state == MergeRangeAcceptedState::Base {
            mapping
                .original_range
                .get_lines(self.result_diff.original_snapshot())
        } else {
            self.with_range(id, |range| {
                if mapping.original_range != range.base_range() {
                    return Err(MergeError::ResultRangeMismatch(id));
                }
                Ok(range.get_base_range_edit(state).new_lines)
            })??
        };

        {
            let mut document = result.borrow_mut();
            let edit = LineRangeEdit::new(mapping.modified_range, new_lines)
                .to_range_edit(document.line_count());
            document.push_stack_element();
            document.push_edit_operations([edit])?;
            document.push_stack_element();
        }
        debug!(range = %id, %state, "applied merge range state");

        // The edit may start on the line before the range, so only `id` becomes handled.
        self.drain_result_events(false);
        if self.range_data.get(&id).is_some_and(|data| !data.is_handled) {
            let alternative_version_id = result.borrow().alternative_version_id();
            self.history.push(alternative_version_id, vec![id]);
            self.set_handled(&[id], true);
        }
        Ok(())
    }

    /// Rewrite the result document with the auto-merged content.
    ///
    /// One-sided and equal changes are taken; genuine conflicts keep the base lines. The write is
    /// a flush (not undoable), and every range's handled state is recomputed from the new
    /// result.
    ///
    /// # Errors
    ///
    /// [`MergeError::NotUpToDate`] unless both side diffs are up to date.
    pub fn reset(&mut self) -> Result<(), MergeError> {
        if self.diff_computing_state_for_sides() != DiffComputingState::UpToDate {
            return Err(MergeError::NotUpToDate);
        }
        let result = self.document(DocumentRole::Result)?;

        let lines = self.compute_auto_merged_result();
        {
            let mut document = result.borrow_mut();
            let eol = document.line_ending();
            document.set_value(&lines.join(eol.as_str()));
        }
        for data in self.range_data.values_mut() {
            data.handled_settled = false;
        }
        debug!(lines = lines.len(), "result reset to auto-merged content");

        self.process_result_events();
        Ok(())
    }

    /// Side 1 to result line map.
    pub fn side1_to_result_line_map(&self) -> Rc<DocumentLineRangeMap> {
        let stamp = (self.side1_diff.revision(), self.result_diff.revision());
        self.maps.side1_to_result.get(stamp, |_| {
            Rc::new(DocumentLineRangeMap::between_modified_sides(
                self.side1_diff.changes(),
                self.result_diff.changes(),
            ))
        })
    }

    /// Result to side 1 line map.
    pub fn result_to_side1_line_map(&self) -> Rc<DocumentLineRangeMap> {
        let stamp = (self.side1_diff.revision(), self.result_diff.revision());
        self.maps
            .result_to_side1
            .get(stamp, |_| Rc::new(self.side1_to_result_line_map().reverse()))
    }

    /// Side 2 to result line map.
    pub fn side2_to_result_line_map(&self) -> Rc<DocumentLineRangeMap> {
        let stamp = (self.side2_diff.revision(), self.result_diff.revision());
        self.maps.side2_to_result.get(stamp, |_| {
            Rc::new(DocumentLineRangeMap::between_modified_sides(
                self.side2_diff.changes(),
                self.result_diff.changes(),
            ))
        })
    }

    /// Result to side 2 line map.
    pub fn result_to_side2_line_map(&self) -> Rc<DocumentLineRangeMap> {
        let stamp = (self.side2_diff.revision(), self.result_diff.revision());
        self.maps
            .result_to_side2
            .get(stamp, |_| Rc::new(self.side2_to_result_line_map().reverse()))
    }

    /// Base to side 1 line map.
    pub fn base_to_side1_line_map(&self) -> Rc<DocumentLineRangeMap> {
        line_map(&self.maps.base_to_side1, &self.side1_diff)
    }

    /// Side 1 to base line map.
    pub fn side1_to_base_line_map(&self) -> Rc<DocumentLineRangeMap> {
        self.maps
            .side1_to_base
            .get(self.side1_diff.revision(), |_| {
                Rc::new(self.base_to_side1_line_map().reverse())
            })
    }

    /// Base to side 2 line map.
    pub fn base_to_side2_line_map(&self) -> Rc<DocumentLineRangeMap> {
        line_map(&self.maps.base_to_side2, &self.side2_diff)
    }

    /// Side 2 to base line map.
    pub fn side2_to_base_line_map(&self) -> Rc<DocumentLineRangeMap> {
        self.maps
            .side2_to_base
            .get(self.side2_diff.revision(), |_| {
                Rc::new(self.base_to_side2_line_map().reverse())
            })
    }

    /// Base to result line map.
    pub fn base_to_result_line_map(&self) -> Rc<DocumentLineRangeMap> {
        line_map(&self.maps.base_to_result, &self.result_diff)
    }

    /// Result to base line map.
    pub fn result_to_base_line_map(&self) -> Rc<DocumentLineRangeMap> {
        self.maps
            .result_to_base
            .get(self.result_diff.revision(), |_| {
                Rc::new(self.base_to_result_line_map().reverse())
            })
    }

    /// Base to side 1 character map.
    pub fn base_to_side1_range_map(&self) -> Rc<DocumentRangeMap> {
        range_map(&self.maps.base_to_side1_chars, &self.side1_diff)
    }

    /// Side 1 to base character map.
    pub fn side1_to_base_range_map(&self) -> Rc<DocumentRangeMap> {
        self.maps
            .side1_to_base_chars
            .get(self.side1_diff.revision(), |_| {
                Rc::new(self.base_to_side1_range_map().reverse())
            })
    }

    /// Base to side 2 character map.
    pub fn base_to_side2_range_map(&self) -> Rc<DocumentRangeMap> {
        range_map(&self.maps.base_to_side2_chars, &self.side2_diff)
    }

    /// Side 2 to base character map.
    pub fn side2_to_base_range_map(&self) -> Rc<DocumentRangeMap> {
        self.maps
            .side2_to_base_chars
            .get(self.side2_diff.revision(), |_| {
                Rc::new(self.base_to_side2_range_map().reverse())
            })
    }

    /// Base to result character map.
    pub fn base_to_result_range_map(&self) -> Rc<DocumentRangeMap> {
        range_map(&self.maps.base_to_result_chars, &self.result_diff)
    }

    /// Result to base character map.
    pub fn result_to_base_range_map(&self) -> Rc<DocumentRangeMap> {
        self.maps
            .result_to_base_chars
            .get(self.result_diff.revision(), |_| {
                Rc::new(self.base_to_result_range_map().reverse())
            })
    }

    fn document(&self, role: DocumentRole) -> Result<SharedDocument, MergeError> {
        let handle = match role {
            DocumentRole::Base => &self.base,
            DocumentRole::Side1 => &self.side1,
            DocumentRole::Side2 => &self.side2,
            DocumentRole::Result => &self.result,
        };
        handle.upgrade().ok_or(MergeError::DocumentDropped(role))
    }

    fn allocate_range_id(&self) -> MergeRangeId {
        let id = self.next_range_id.get();
        self.next_range_id.set(id + 1);
        MergeRangeId(id)
    }

    fn with_range<R>(
        &self,
        id: MergeRangeId,
        f: impl FnOnce(&MergeRange) -> R,
    ) -> Result<R, MergeError> {
        let ranges = self.merge_ranges();
        let range = ranges
            .iter()
            .find(|range| range.id() == id)
            .ok_or(MergeError::UnknownMergeRange(id))?;
        Ok(f(range))
    }

    /// Carry range data over to re-derived merge ranges, by id.
    fn sync_range_data(&mut self) {
        let ranges = self.merge_ranges();
        if self
            .synced_ranges
            .as_ref()
            .is_some_and(|synced| Rc::ptr_eq(synced, &ranges))
        {
            return;
        }

        let previous = std::mem::take(&mut self.range_data);
        self.range_data = ranges
            .iter()
            .map(|range| {
                let data = previous.get(&range.id()).copied().unwrap_or_default();
                (range.id(), data)
            })
            .collect();
        self.synced_ranges = Some(ranges);
    }

    fn recompute_result_states(&mut self) {
        let ranges = self.merge_ranges();
        trace!(count = ranges.len(), "recomputing merge range result states");
        for range in ranges.iter() {
            let state = self.compute_result_state(range);
            if let Some(data) = self.range_data.get_mut(&range.id()) {
                data.result_state = state;
                if !data.handled_settled {
                    data.is_handled =
                        state != MergeRangeResultState::Accepted(MergeRangeAcceptedState::Base);
                    data.handled_settled = true;
                }
            }
        }
    }

    fn compute_result_state(&self, range: &MergeRange) -> MergeRangeResultState {
        let result_range = self.project_to_result(range.base_range()).modified_range;
        let snapshot = self.result_diff.modified_snapshot();
        if result_range.end_line_exclusive() > snapshot.line_count() {
            return MergeRangeResultState::Unrecognized;
        }
        let existing = result_range.get_lines(snapshot);

        MergeRangeAcceptedState::RECOGNITION_ORDER
            .into_iter()
            .find(|state| range.get_base_range_edit(*state).new_lines == existing)
            .map(MergeRangeResultState::Accepted)
            .unwrap_or(MergeRangeResultState::Unrecognized)
    }

    fn project_to_result(&self, base_range: LineRange) -> LineRangeMapping {
        let changes = self.result_diff.changes();
        let (start_base, start_result) = match project_line(changes, base_range.start_line()) {
            ProjectedLine::Line(line) => (base_range.start_line(), line),
            ProjectedLine::Change(change) => (
                change.original_range.start_line(),
                change.modified_range.start_line(),
            ),
        };
        let end = base_range.end_line_exclusive();
        let (end_base, end_result) = match project_line(changes, end) {
            ProjectedLine::Line(line) => (end, line),
            ProjectedLine::Change(change) => (
                change.original_range.end_line_exclusive(),
                change.modified_range.end_line_exclusive(),
            ),
        };

        LineRangeMapping::new(
            LineRange::from_line_numbers(start_base, end_base),
            LineRange::from_line_numbers(start_result, end_result),
        )
    }

    fn compute_auto_merged_result(&self) -> Vec<String> {
        let base = self.side1_diff.original_snapshot();
        let mut lines: Vec<String> = Vec::with_capacity(base.line_count());
        let mut base_start = 0;

        for range in self.merge_ranges().iter() {
            let base_range = range.base_range();
            let unchanged = LineRange::from_line_numbers(base_start, base_range.start_line());
            lines.extend(unchanged.get_lines(base));

            let side1_changed = !range.side_changes(MergeSide::Side1).is_empty();
            let side2_changed = !range.side_changes(MergeSide::Side2).is_empty();
            if !side1_changed {
                lines.extend(range.side_lines(MergeSide::Side2));
            } else if !side2_changed || range.is_equal_change() {
                lines.extend(range.side_lines(MergeSide::Side1));
            } else {
                lines.extend(range.base_lines());
            }
            base_start = base_range.end_line_exclusive();
        }

        lines.extend(LineRange::from_line_numbers(base_start, base.line_count()).get_lines(base));
        lines
    }

    fn process_result_events(&mut self) {
        self.drain_result_events(true);
    }

    fn drain_result_events(&mut self, mark_touched: bool) {
        for event in self.result_events.drain() {
            for replay in self.history.handle_event(&event) {
                match replay {
                    HistoryReplay::Redo(ids) => self.set_handled(&ids, true),
                    HistoryReplay::Undo(ids) => self.set_handled(&ids, false),
                }
            }
            if !mark_touched || event.is_undoing || event.is_redoing || event.is_flush {
                continue;
            }

            let ids = self.unhandled_ranges_touched_by(&event);
            if ids.is_empty() {
                continue;
            }
            trace!(count = ids.len(), "result edit marks merge ranges handled");
            self.history.push(event.alternative_version_id, ids.clone());
            self.set_handled(&ids, true);
        }
    }

    fn unhandled_ranges_touched_by(&self, event: &ContentChangeEvent) -> Vec<MergeRangeId> {
        let mut ids: Vec<MergeRangeId> = Vec::new();
        for change in &event.changes {
            let base = self.translate_result_range_to_base(change.range);
            let base_lines = LineRange::from_line_numbers(base.start.line, base.end.line);
            for id in self.find_merge_ranges(base_lines) {
                let unhandled = self.range_data.get(&id).is_some_and(|data| !data.is_handled);
                if unhandled && !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    fn set_handled(&mut self, ids: &[MergeRangeId], handled: bool) {
        for id in ids {
            if let Some(data) = self.range_data.get_mut(id) {
                data.is_handled = handled;
                data.handled_settled = true;
            }
        }
    }
}

fn line_map(
    cache: &Derived<u64, DocumentLineRangeMap>,
    diff: &LiveDiff,
) -> Rc<DocumentLineRangeMap> {
    cache.get(diff.revision(), |_| {
        Rc::new(DocumentLineRangeMap::from_mappings(diff.changes()))
    })
}

fn range_map(cache: &Derived<u64, DocumentRangeMap>, diff: &LiveDiff) -> Rc<DocumentRangeMap> {
    cache.get(diff.revision(), |_| {
        Rc::new(DocumentRangeMap::from_detailed(diff.changes()))
    })
}

/// Project a base line through the result changes.
///
/// A line inside a change, or directly at its end, projects to the whole change; other lines
/// shift by the delta of the last change before them.
fn project_line(changes: &[DetailedLineRangeMapping], line: usize) -> ProjectedLine {
    let mut offset: isize = 0;
    for change in changes {
        let original = change.original_range();
        if original.contains_line(line) || original.end_line_exclusive() == line {
            return ProjectedLine::Change(LineRangeMapping::new(original, change.modified_range()));
        }
        if original.end_line_exclusive() < line {
            offset = change.modified_range().end_line_exclusive() as isize
                - original.end_line_exclusive() as isize;
        } else {
            break;
        }
    }
    ProjectedLine::Line(line.saturating_add_signed(offset))
}
