#![warn(missing_docs)]
//! Diff capability for `merge-core`, backed by the [`similar`] crate.
//!
//! [`SimilarDiffComputer`] produces line changes with character-level inner changes, which is
//! what smart combination of merge ranges needs. It can run inline (the handle is complete on
//! return) or on a worker thread per request.
//!
//! ```rust
//! use merge_core::{DiffComputer, TextSnapshot};
//! use merge_core_similar::SimilarDiffComputer;
//!
//! let computer = SimilarDiffComputer::new();
//! let original = TextSnapshot::from_text("a\nb\nc");
//! let modified = TextSnapshot::from_text("a\nB\nc");
//! let diff = computer.compute_lines_diff(&original, &modified).unwrap();
//! assert_eq!(diff.changes.len(), 1);
//! ```

use merge_core::{
    CharRange, DiffComputer, DiffHandle, LineChange, LineRange, LinesDiff, Position, RangeMapping,
    TextSnapshot,
};
use similar::{Algorithm, DiffOp, DiffTag};
use std::ops::Range;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Options for [`SimilarDiffComputer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarDiffOptions {
    /// Diff algorithm for both the line and the character pass.
    pub algorithm: Algorithm,
    /// Give up after this long and fail the request.
    pub timeout: Option<Duration>,
    /// Compute character-level changes inside changed line regions.
    pub inner_changes: bool,
    /// Compute on a worker thread instead of inline.
    pub threaded: bool,
}

impl Default for SimilarDiffOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Myers,
            timeout: None,
            inner_changes: true,
            threaded: false,
        }
    }
}

/// A [`DiffComputer`] backed by `similar`.
#[derive(Debug, Clone, Default)]
pub struct SimilarDiffComputer {
    options: SimilarDiffOptions,
}

impl SimilarDiffComputer {
    /// Inline Myers diff with inner changes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given options.
    pub fn with_options(options: SimilarDiffOptions) -> Self {
        Self { options }
    }

    /// Compute on a worker thread per request.
    pub fn threaded(mut self) -> Self {
        self.options.threaded = true;
        self
    }

    /// Fail requests that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Current options.
    pub fn options(&self) -> &SimilarDiffOptions {
        &self.options
    }

    /// Compute the diff synchronously. Returns `None` if the timeout expired.
    pub fn compute_lines_diff(
        &self,
        original: &TextSnapshot,
        modified: &TextSnapshot,
    ) -> Option<LinesDiff> {
        compute(&self.options, original, modified)
    }
}

impl DiffComputer for SimilarDiffComputer {
    fn compute_diff(&self, original: &TextSnapshot, modified: &TextSnapshot) -> DiffHandle {
        if !self.options.threaded {
            return DiffHandle::ready(compute(&self.options, original, modified));
        }

        let (tx, handle) = DiffHandle::pending();
        let options = self.options;
        let original = original.clone();
        let modified = modified.clone();
        let spawned = thread::Builder::new()
            .name("merge-diff".to_string())
            .spawn(move || tx.send(compute(&options, &original, &modified)));
        if let Err(err) = spawned {
            // The sender was dropped with the closure, so the handle reports a failure.
            warn!(%err, "failed to spawn diff worker");
        }
        handle
    }
}

fn compute(
    options: &SimilarDiffOptions,
    original: &TextSnapshot,
    modified: &TextSnapshot,
) -> Option<LinesDiff> {
    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    let ops = similar::capture_diff_slices_deadline(
        options.algorithm,
        original.lines(),
        modified.lines(),
        deadline,
    );
    if deadline.is_some_and(|deadline| Instant::now() > deadline) {
        debug!(
            original = original.line_count(),
            modified = modified.line_count(),
            "line diff timed out"
        );
        return None;
    }

    let changes = group_changes(&ops)
        .into_iter()
        .map(|(old, new)| {
            let inner_changes = (options.inner_changes && !old.is_empty() && !new.is_empty())
                .then(|| inner_changes(options, original, old.clone(), modified, new.clone()));
            LineChange {
                original: LineRange::from_line_numbers(old.start, old.end),
                modified: LineRange::from_line_numbers(new.start, new.end),
                inner_changes,
            }
        })
        .collect();
    Some(LinesDiff { changes })
}

/// Merge runs of adjacent non-equal ops into `(old, new)` index ranges.
fn group_changes(ops: &[DiffOp]) -> Vec<(Range<usize>, Range<usize>)> {
    let mut groups: Vec<(Range<usize>, Range<usize>)> = Vec::new();
    let mut open = false;
    for op in ops {
        if op.tag() == DiffTag::Equal {
            open = false;
            continue;
        }
        let (old, new) = (op.old_range(), op.new_range());
        match groups.last_mut() {
            Some(last) if open => {
                last.0.end = old.end;
                last.1.end = new.end;
            }
            _ => groups.push((old, new)),
        }
        open = true;
    }
    groups
}

/// Character-level changes between two line regions, in document coordinates.
fn inner_changes(
    options: &SimilarDiffOptions,
    original: &TextSnapshot,
    old_lines: Range<usize>,
    modified: &TextSnapshot,
    new_lines: Range<usize>,
) -> Vec<RangeMapping> {
    let old = RegionText::new(original, old_lines);
    let new = RegionText::new(modified, new_lines);
    let ops =
        similar::capture_diff_slices(options.algorithm, old.chars.as_slice(), new.chars.as_slice());

    group_changes(&ops)
        .into_iter()
        .map(|(old_range, new_range)| {
            RangeMapping::new(
                CharRange::new(old.position(old_range.start), old.position(old_range.end)),
                CharRange::new(new.position(new_range.start), new.position(new_range.end)),
            )
        })
        .collect()
}

/// Lines of a region joined with `\n`, as characters.
struct RegionText {
    first_line: usize,
    chars: Vec<char>,
    /// Character offset of every line start.
    line_starts: Vec<usize>,
}

impl RegionText {
    fn new(snapshot: &TextSnapshot, lines: Range<usize>) -> Self {
        let mut chars = Vec::new();
        let mut line_starts = Vec::with_capacity(lines.len());
        for (index, line) in lines.clone().enumerate() {
            if index > 0 {
                chars.push('\n');
            }
            line_starts.push(chars.len());
            chars.extend(snapshot.line(line).chars());
        }
        Self {
            first_line: lines.start,
            chars,
            line_starts,
        }
    }

    fn position(&self, offset: usize) -> Position {
        let index = self
            .line_starts
            .partition_point(|start| *start <= offset)
            .saturating_sub(1);
        Position::new(self.first_line + index, offset - self.line_starts[index])
    }
}
