#![allow(dead_code)]

use merge_core::{
    DiffComputer, DiffHandle, DiffSender, LineChange, LineRange, LinesDiff, MergeDocuments,
    SharedDocument, TextDocument, TextSnapshot,
};
use similar::{Algorithm, DiffTag};
use std::cell::RefCell;

/// Line-level diff without inner changes, completed inline.
pub struct LineDiffComputer;

impl LineDiffComputer {
    pub fn diff(original: &TextSnapshot, modified: &TextSnapshot) -> LinesDiff {
        let ops =
            similar::capture_diff_slices(Algorithm::Myers, original.lines(), modified.lines());
        let mut changes: Vec<LineChange> = Vec::new();
        let mut open = false;
        for op in &ops {
            if op.tag() == DiffTag::Equal {
                open = false;
                continue;
            }
            let (old, new) = (op.old_range(), op.new_range());
            match changes.last_mut() {
                Some(last) if open => {
                    let (original_start, modified_start) =
                        (last.original.start_line(), last.modified.start_line());
                    last.original = LineRange::from_line_numbers(original_start, old.end);
                    last.modified = LineRange::from_line_numbers(modified_start, new.end);
                }
                _ => changes.push(LineChange {
                    original: LineRange::from_line_numbers(old.start, old.end),
                    modified: LineRange::from_line_numbers(new.start, new.end),
                    inner_changes: None,
                }),
            }
            open = true;
        }
        LinesDiff { changes }
    }
}

impl DiffComputer for LineDiffComputer {
    fn compute_diff(&self, original: &TextSnapshot, modified: &TextSnapshot) -> DiffHandle {
        DiffHandle::ready(Some(Self::diff(original, modified)))
    }
}

/// Computes like [`LineDiffComputer`] but holds every result until released.
#[derive(Default)]
pub struct DeferredDiffComputer {
    pending: RefCell<Vec<(DiffSender, LinesDiff)>>,
}

impl DeferredDiffComputer {
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn release_all(&self) {
        for (sender, diff) in self.pending.borrow_mut().drain(..) {
            sender.send(Some(diff));
        }
    }

    pub fn fail_all(&self) {
        for (sender, _) in self.pending.borrow_mut().drain(..) {
            sender.send(None);
        }
    }
}

impl DiffComputer for DeferredDiffComputer {
    fn compute_diff(&self, original: &TextSnapshot, modified: &TextSnapshot) -> DiffHandle {
        let (sender, handle) = DiffHandle::pending();
        let diff = LineDiffComputer::diff(original, modified);
        self.pending.borrow_mut().push((sender, diff));
        handle
    }
}

pub fn documents(base: &str, side1: &str, side2: &str, result: &str) -> MergeDocuments {
    MergeDocuments {
        base: TextDocument::shared(base),
        side1: TextDocument::shared(side1),
        side2: TextDocument::shared(side2),
        result: TextDocument::shared(result),
    }
}

pub fn text(document: &SharedDocument) -> String {
    document.borrow().text()
}

pub fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
