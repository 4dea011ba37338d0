//! Secondary history attached to a document's undo stack.
//!
//! Elements are recorded against the document's alternative version id at the time they
//! happen. When the document later undoes or redoes across that version id, the element is
//! handed back to the owner to revert or replay. A new edit after an undo drops the elements
//! that were on the redo side, mirroring how the text redo stack is discarded.

use crate::delta::ContentChangeEvent;

/// An element to revert or replay, returned by [`AttachedHistory::handle_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryReplay<E> {
    /// Re-apply the element (the document redid past it).
    Redo(E),
    /// Revert the element (the document undid past it).
    Undo(E),
}

/// Append-only list of elements keyed by alternative version id.
#[derive(Debug, Clone)]
pub struct AttachedHistory<E> {
    /// Sorted by version id.
    items: Vec<(u64, E)>,
    previous_alternative_version_id: u64,
}

impl<E: Clone> AttachedHistory<E> {
    /// Create an empty history for a document currently at `alternative_version_id`.
    pub fn new(alternative_version_id: u64) -> Self {
        Self {
            items: Vec::new(),
            previous_alternative_version_id: alternative_version_id,
        }
    }

    /// Record an element at the document's current alternative version id.
    pub fn push(&mut self, alternative_version_id: u64, element: E) {
        debug_assert!(
            self.items
                .last()
                .is_none_or(|(id, _)| *id <= alternative_version_id),
            "attached history must be recorded in version order"
        );
        self.items.push((alternative_version_id, element));
    }

    /// Number of recorded elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Advance the history past one document change event.
    ///
    /// Returns the elements to replay (redo, oldest first) or revert (undo, newest first). A
    /// flush drops the whole history.
    pub fn handle_event(&mut self, event: &ContentChangeEvent) -> Vec<HistoryReplay<E>> {
        let previous = self.previous_alternative_version_id;
        let current = event.alternative_version_id;
        self.previous_alternative_version_id = current;

        if event.is_flush {
            self.items.clear();
            return Vec::new();
        }

        if event.is_redoing {
            let window = self.window(previous, current);
            return self.items[window]
                .iter()
                .map(|(_, element)| HistoryReplay::Redo(element.clone()))
                .collect();
        }

        if event.is_undoing {
            let window = self.window(current, previous);
            return self.items[window]
                .iter()
                .rev()
                .map(|(_, element)| HistoryReplay::Undo(element.clone()))
                .collect();
        }

        let keep = self.items.partition_point(|(id, _)| *id <= previous);
        self.items.truncate(keep);
        Vec::new()
    }

    /// Index range of items with `low < id <= high`.
    fn window(&self, low: u64, high: u64) -> std::ops::Range<usize> {
        let start = self.items.partition_point(|(id, _)| *id <= low);
        let end = self.items.partition_point(|(id, _)| *id <= high);
        start..end.max(start)
    }
}
