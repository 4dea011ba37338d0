//! A continuously updated diff between two observed documents.
//!
//! The diff algorithm is an injected capability ([`DiffComputer`]) that may complete
//! synchronously or on a worker. Every content change on either document issues a new request
//! tagged with a monotonically increasing generation; completions of superseded generations are
//! discarded. Completed results are delivered through a [`DiffHandle`], a one-shot channel in the
//! style of the request/response plumbing used by the LSP client.

use crate::delta::ContentChangeReceiver;
use crate::document::{SharedDocument, TextDocument};
use crate::line_range::LineRange;
use crate::position::CharRange;
use crate::range_mapping::{DetailedLineRangeMapping, RangeMapping};
use crate::text::TextSnapshot;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::mpsc;
use tracing::{debug, trace, warn};

/// One changed line region reported by a diff computer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChange {
    /// Lines in the original document.
    pub original: LineRange,
    /// Lines in the modified document.
    pub modified: LineRange,
    /// Optional character-level changes inside the region, in document coordinates.
    pub inner_changes: Option<Vec<RangeMapping>>,
}

/// The result of a line diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinesDiff {
    /// Changes ordered by position, non-overlapping on both sides.
    pub changes: Vec<LineChange>,
}

/// The diff capability.
pub trait DiffComputer {
    /// Start computing the diff between two snapshots.
    fn compute_diff(&self, original: &TextSnapshot, modified: &TextSnapshot) -> DiffHandle;
}

enum HandleState {
    Ready(Option<LinesDiff>),
    Waiting(mpsc::Receiver<Option<LinesDiff>>),
    Taken,
}

/// One-shot completion of a diff request.
///
/// A result of `None`, or a sender dropped without sending, is a failed computation.
pub struct DiffHandle {
    state: HandleState,
}

impl DiffHandle {
    /// A handle that is already complete.
    pub fn ready(result: Option<LinesDiff>) -> Self {
        Self {
            state: HandleState::Ready(result),
        }
    }

    /// A handle completed later through the returned sender.
    pub fn pending() -> (DiffSender, DiffHandle) {
        let (tx, rx) = mpsc::channel();
        (
            DiffSender { tx },
            DiffHandle {
                state: HandleState::Waiting(rx),
            },
        )
    }

    /// Take the result if the request finished.
    fn try_take(&mut self) -> Option<Option<LinesDiff>> {
        match std::mem::replace(&mut self.state, HandleState::Taken) {
            HandleState::Ready(result) => Some(result),
            HandleState::Waiting(rx) => match rx.try_recv() {
                Ok(result) => Some(result),
                Err(mpsc::TryRecvError::Empty) => {
                    self.state = HandleState::Waiting(rx);
                    None
                }
                Err(mpsc::TryRecvError::Disconnected) => Some(None),
            },
            HandleState::Taken => Some(None),
        }
    }
}

/// Completes a pending [`DiffHandle`]. Can be moved to another thread.
#[derive(Debug)]
pub struct DiffSender {
    tx: mpsc::Sender<Option<LinesDiff>>,
}

impl DiffSender {
    /// Deliver the result.
    pub fn send(self, result: Option<LinesDiff>) {
        // The receiver is gone once its request has been superseded.
        let _ = self.tx.send(result);
    }
}

/// State of a [`LiveDiff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveDiffState {
    /// No result has been published yet.
    Initializing,
    /// The published changes match the current document contents.
    UpToDate,
    /// A newer request is outstanding.
    Updating,
    /// The latest request failed; previous changes are retained.
    Error,
}

struct PendingDiff {
    generation: u64,
    original: TextSnapshot,
    modified: TextSnapshot,
    handle: DiffHandle,
}

/// A diff between two documents, kept up to date as they change.
pub struct LiveDiff {
    original_document: Weak<RefCell<TextDocument>>,
    modified_document: Weak<RefCell<TextDocument>>,
    original_events: ContentChangeReceiver,
    modified_events: ContentChangeReceiver,
    computer: Rc<dyn DiffComputer>,
    generation: u64,
    requested_versions: (u64, u64),
    pending: Vec<PendingDiff>,
    state: LiveDiffState,
    changes: Vec<DetailedLineRangeMapping>,
    original_snapshot: TextSnapshot,
    modified_snapshot: TextSnapshot,
    revision: u64,
}

impl LiveDiff {
    /// Start observing two documents and issue the first diff request.
    pub fn new(
        original: &SharedDocument,
        modified: &SharedDocument,
        computer: Rc<dyn DiffComputer>,
    ) -> Self {
        let original_events = original.borrow_mut().subscribe();
        let modified_events = modified.borrow_mut().subscribe();
        let original_snapshot = original.borrow().snapshot();
        let modified_snapshot = modified.borrow().snapshot();

        let mut live_diff = Self {
            original_document: Rc::downgrade(original),
            modified_document: Rc::downgrade(modified),
            original_events,
            modified_events,
            computer,
            generation: 0,
            requested_versions: (0, 0),
            pending: Vec::new(),
            state: LiveDiffState::Initializing,
            changes: Vec::new(),
            original_snapshot,
            modified_snapshot,
            revision: 0,
        };
        live_diff.request_update();
        live_diff.collect_completions();
        live_diff
    }

    /// Current state.
    ///
    /// Reports [`LiveDiffState::Updating`] as soon as either document has changed since the
    /// latest request, even before the change notification has been polled.
    pub fn state(&self) -> LiveDiffState {
        match self.state {
            LiveDiffState::UpToDate | LiveDiffState::Error if self.documents_changed() => {
                LiveDiffState::Updating
            }
            state => state,
        }
    }

    /// The latest published changes.
    pub fn changes(&self) -> &[DetailedLineRangeMapping] {
        &self.changes
    }

    /// Snapshot of the original document the published changes were computed on.
    pub fn original_snapshot(&self) -> &TextSnapshot {
        &self.original_snapshot
    }

    /// Snapshot of the modified document the published changes were computed on.
    pub fn modified_snapshot(&self) -> &TextSnapshot {
        &self.modified_snapshot
    }

    /// Counter bumped every time new changes are published.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Drain change notifications, issue a request if anything changed, and collect finished
    /// requests. Returns `true` if new changes were published.
    pub fn poll(&mut self) -> bool {
        let original_changed = !self.original_events.drain().is_empty();
        let modified_changed = !self.modified_events.drain().is_empty();
        if original_changed || modified_changed {
            self.request_update();
        }
        self.collect_completions()
    }

    /// Issue a new diff request for the current document contents.
    pub fn request_update(&mut self) {
        let (Some(original), Some(modified)) = (
            self.original_document.upgrade(),
            self.modified_document.upgrade(),
        ) else {
            debug!("live diff document dropped; skipping request");
            return;
        };
        let original = original.borrow().snapshot();
        let modified = modified.borrow().snapshot();

        self.generation += 1;
        self.requested_versions = (original.version_id(), modified.version_id());
        if self.state != LiveDiffState::Initializing {
            self.state = LiveDiffState::Updating;
        }
        trace!(generation = self.generation, "requesting diff");

        let handle = self.computer.compute_diff(&original, &modified);
        self.pending.push(PendingDiff {
            generation: self.generation,
            original,
            modified,
            handle,
        });
    }

    fn collect_completions(&mut self) -> bool {
        let mut published = false;
        let mut index = 0;
        while index < self.pending.len() {
            let Some(result) = self.pending[index].handle.try_take() else {
                index += 1;
                continue;
            };
            let pending = self.pending.remove(index);
            if pending.generation != self.generation {
                debug!(
                    generation = pending.generation,
                    current = self.generation,
                    "discarding stale diff result"
                );
                continue;
            }
            published |= self.publish(pending, result);
            // Anything older can no longer be published.
            self.pending.retain(|p| p.generation > self.generation);
        }
        published
    }

    fn publish(&mut self, pending: PendingDiff, result: Option<LinesDiff>) -> bool {
        let Some(diff) = result else {
            warn!(generation = pending.generation, "diff computation failed");
            self.state = LiveDiffState::Error;
            return false;
        };

        match to_detailed_mappings(diff, &pending.original, &pending.modified) {
            Ok(changes) => {
                self.changes = changes;
                self.original_snapshot = pending.original;
                self.modified_snapshot = pending.modified;
                self.state = LiveDiffState::UpToDate;
                self.revision += 1;
                true
            }
            Err(reason) => {
                warn!(generation = pending.generation, reason, "malformed diff result");
                self.state = LiveDiffState::Error;
                false
            }
        }
    }

    fn documents_changed(&self) -> bool {
        version_changed(&self.original_document, self.requested_versions.0)
            || version_changed(&self.modified_document, self.requested_versions.1)
    }
}

fn version_changed(document: &Weak<RefCell<TextDocument>>, version: u64) -> bool {
    let Some(document) = document.upgrade() else {
        return false;
    };
    let Ok(document) = document.try_borrow() else {
        return false;
    };
    document.version_id() != version
}

/// Validate a diff against the snapshots it was computed on and attach the snapshots.
fn to_detailed_mappings(
    diff: LinesDiff,
    original: &TextSnapshot,
    modified: &TextSnapshot,
) -> Result<Vec<DetailedLineRangeMapping>, &'static str> {
    for change in &diff.changes {
        if change.original.end_line_exclusive() > original.line_count()
            || change.modified.end_line_exclusive() > modified.line_count()
        {
            return Err("line range outside document");
        }
    }
    for pair in diff.changes.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if !a.original.is_before(&b.original) || !a.modified.is_before(&b.modified) {
            return Err("changes out of order");
        }
        if b.original.start_line() - a.original.end_line_exclusive()
            != b.modified.start_line() - a.modified.end_line_exclusive()
        {
            return Err("inconsistent gap between changes");
        }
    }

    let mappings: Vec<DetailedLineRangeMapping> = diff
        .changes
        .into_iter()
        .map(|change| {
            DetailedLineRangeMapping::new(
                change.original,
                original.clone(),
                change.modified,
                modified.clone(),
                change.inner_changes,
            )
        })
        .collect();

    let inner: Vec<&RangeMapping> = mappings.iter().flat_map(|m| m.range_mappings()).collect();
    for mapping in &inner {
        let in_bounds = |snapshot: &TextSnapshot, range: CharRange| {
            snapshot.validate_position(range.start) == range.start
                && snapshot.validate_position(range.end) == range.end
        };
        if !in_bounds(original, mapping.original_range)
            || !in_bounds(modified, mapping.modified_range)
        {
            return Err("character range outside document");
        }
    }
    for pair in inner.windows(2) {
        if !pair[0].original_range.is_before(&pair[1].original_range)
            || !pair[0].modified_range.is_before(&pair[1].modified_range)
        {
            return Err("character changes out of order");
        }
    }

    Ok(mappings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use crate::range_editing::RangeEdit;

    /// Hands out pending handles and lets the test complete them in any order.
    #[derive(Default)]
    struct ManualDiffComputer {
        senders: RefCell<Vec<DiffSender>>,
    }

    impl DiffComputer for ManualDiffComputer {
        fn compute_diff(&self, _original: &TextSnapshot, _modified: &TextSnapshot) -> DiffHandle {
            let (tx, handle) = DiffHandle::pending();
            self.senders.borrow_mut().push(tx);
            handle
        }
    }

    fn one_change(line: usize) -> LinesDiff {
        LinesDiff {
            changes: vec![LineChange {
                original: LineRange::new(line, 1),
                modified: LineRange::new(line, 1),
                inner_changes: None,
            }],
        }
    }

    fn append(document: &SharedDocument, text: &str) {
        document
            .borrow_mut()
            .push_edit_operations([RangeEdit::new(
                CharRange::collapsed(Position::new(usize::MAX, 0)),
                text,
            )])
            .unwrap();
    }

    #[test]
    fn test_initializing_until_first_result() {
        let computer = Rc::new(ManualDiffComputer::default());
        let original = TextDocument::shared("a\nb");
        let modified = TextDocument::shared("a\nB");
        let mut live = LiveDiff::new(&original, &modified, computer.clone());
        assert_eq!(live.state(), LiveDiffState::Initializing);

        let sender = computer.senders.borrow_mut().remove(0);
        sender.send(Some(one_change(1)));
        assert!(live.poll());
        assert_eq!(live.state(), LiveDiffState::UpToDate);
        assert_eq!(live.changes().len(), 1);
        assert_eq!(live.revision(), 1);
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let computer = Rc::new(ManualDiffComputer::default());
        let original = TextDocument::shared("a\nb");
        let modified = TextDocument::shared("a\nb");
        let mut live = LiveDiff::new(&original, &modified, computer.clone());

        append(&modified, "x");
        assert_eq!(live.state(), LiveDiffState::Initializing);
        live.poll();
        let mut senders = std::mem::take(&mut *computer.senders.borrow_mut());
        assert_eq!(senders.len(), 2);

        // The newer request finishes first, then the superseded one.
        senders.remove(1).send(Some(one_change(1)));
        assert!(live.poll());
        senders.remove(0).send(Some(LinesDiff::default()));
        assert!(!live.poll());

        assert_eq!(live.changes().len(), 1);
        assert_eq!(live.state(), LiveDiffState::UpToDate);
    }

    #[test]
    fn test_failure_keeps_previous_changes() {
        let computer = Rc::new(ManualDiffComputer::default());
        let original = TextDocument::shared("a\nb");
        let modified = TextDocument::shared("a\nB");
        let mut live = LiveDiff::new(&original, &modified, computer.clone());
        computer.senders.borrow_mut().remove(0).send(Some(one_change(1)));
        live.poll();

        append(&modified, "!");
        live.poll();
        assert_eq!(live.state(), LiveDiffState::Updating);
        // Dropping the sender counts as a failure.
        computer.senders.borrow_mut().clear();
        assert!(!live.poll());

        assert_eq!(live.state(), LiveDiffState::Error);
        assert_eq!(live.changes().len(), 1);
        assert_eq!(live.revision(), 1);
    }

    #[test]
    fn test_unpolled_edit_reports_updating() {
        let computer = Rc::new(ManualDiffComputer::default());
        let original = TextDocument::shared("a");
        let modified = TextDocument::shared("a");
        let mut live = LiveDiff::new(&original, &modified, computer.clone());
        computer
            .senders
            .borrow_mut()
            .remove(0)
            .send(Some(LinesDiff::default()));
        live.poll();
        assert_eq!(live.state(), LiveDiffState::UpToDate);

        append(&original, "b");
        assert_eq!(live.state(), LiveDiffState::Updating);
    }

    #[test]
    fn test_malformed_result_is_a_failure() {
        let computer = Rc::new(ManualDiffComputer::default());
        let original = TextDocument::shared("a");
        let modified = TextDocument::shared("a");
        let mut live = LiveDiff::new(&original, &modified, computer.clone());
        computer
            .senders
            .borrow_mut()
            .remove(0)
            .send(Some(one_change(5)));
        assert!(!live.poll());
        assert_eq!(live.state(), LiveDiffState::Error);
    }
}
