#![warn(missing_docs)]
//! Merge Core - Headless Three-Way Merge Model
//!
//! # Overview
//!
//! `merge-core` is the model behind a three-way merge editor. It observes four text documents
//! (a common *base*, two modified *sides* and the editable *result*), keeps live diffs of each
//! against the base, aligns the two side diffs into [`MergeRange`]s, recognizes which resolution
//! the result currently holds for each range and writes resolutions back as undoable edits.
//!
//! It does not render anything and does not diff text by itself: the diff algorithm is injected
//! through the [`DiffComputer`] trait (see the `merge-core-similar` crate for an implementation).
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  MergeEditorModel                           │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  MergeRange (states, smart/dumb combine)    │  ← Resolutions
//! ├─────────────────────────────────────────────┤
//! │  MappingAlignment / Document*Map            │  ← Alignment & Projection
//! ├─────────────────────────────────────────────┤
//! │  LiveDiff (DiffComputer, generations)       │  ← Diff Tracking
//! ├─────────────────────────────────────────────┤
//! │  TextDocument (rope, undo, change events)   │  ← Text Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use merge_core::{
//!     DiffComputer, DiffHandle, LineChange, LineRange, LinesDiff, MergeDocuments,
//!     MergeEditorModel, MergeEditorOptions, MergeRangeAcceptedState, TextDocument, TextSnapshot,
//! };
//!
//! /// Reports the second line as changed whenever the texts differ.
//! struct SecondLine;
//!
//! impl DiffComputer for SecondLine {
//!     fn compute_diff(&self, original: &TextSnapshot, modified: &TextSnapshot) -> DiffHandle {
//!         let changes = if original.lines() == modified.lines() {
//!             Vec::new()
//!         } else {
//!             vec![LineChange {
//!                 original: LineRange::new(1, 1),
//!                 modified: LineRange::new(1, 1),
//!                 inner_changes: None,
//!             }]
//!         };
//!         DiffHandle::ready(Some(LinesDiff { changes }))
//!     }
//! }
//!
//! let documents = MergeDocuments {
//!     base: TextDocument::shared("a\nb\nc"),
//!     side1: TextDocument::shared("a\nB\nc"),
//!     side2: TextDocument::shared("a\nb\nc"),
//!     result: TextDocument::shared("a\nb\nc"),
//! };
//! let mut model =
//!     MergeEditorModel::new(&documents, Rc::new(SecondLine), MergeEditorOptions::default())
//!         .unwrap();
//!
//! let id = model.merge_ranges()[0].id();
//! assert!(!model.is_merge_range_handled(id).unwrap());
//!
//! model
//!     .apply_merge_range_accepted_state(id, MergeRangeAcceptedState::Side1)
//!     .unwrap();
//! model.update().unwrap();
//! assert_eq!(documents.result.borrow().text(), "a\nB\nc");
//! assert!(model.is_merge_range_handled(id).unwrap());
//! ```
//!
//! # Module Description
//!
//! - [`text`] / [`position`] / [`line_range`] - Immutable snapshots and coordinates
//! - [`document`] - Rope-backed documents with undo groups and change events
//! - [`live_diff`] - Continuously updated diffs with stale-result protection
//! - [`range_mapping`] / [`mapping_alignment`] - Diff mappings, projections and alignment
//! - [`merge_range`] - Merge ranges and their synthesized resolutions
//! - [`history`] - Undo-aware history attached to a document
//! - [`model`] - The merge model
//!
//! # Threading
//!
//! The model is single-threaded (`Rc`/`RefCell`). Only diff computation may happen elsewhere:
//! a [`DiffSender`] can be moved to a worker thread and completed from there.

mod cache;
pub mod delta;
pub mod document;
pub mod error;
pub mod history;
pub mod line_ending;
pub mod line_range;
pub mod live_diff;
pub mod mapping_alignment;
pub mod merge_range;
pub mod model;
pub mod position;
pub mod range_editing;
pub mod range_mapping;
pub mod text;

pub use delta::{ContentChange, ContentChangeEvent, ContentChangeReceiver};
pub use document::{DocumentError, SharedDocument, TextDocument};
pub use error::MergeError;
pub use history::{AttachedHistory, HistoryReplay};
pub use line_ending::LineEnding;
pub use line_range::LineRange;
pub use live_diff::{
    DiffComputer, DiffHandle, DiffSender, LineChange, LinesDiff, LiveDiff, LiveDiffState,
};
pub use mapping_alignment::{LineMapping, MappingAlignment};
pub use merge_range::{
    MergeRange, MergeRangeAcceptedState, MergeRangeId, MergeRangeResultState, MergeSide,
};
pub use model::{
    DiffComputingState, DocumentRole, MergeDocuments, MergeEditorModel, MergeEditorOptions,
    MergeRangeData,
};
pub use position::{CharRange, Position};
pub use range_editing::{LineRangeEdit, RangeEdit};
pub use range_mapping::{
    DetailedLineRangeMapping, DocumentLineRangeMap, DocumentRangeMap, LineRangeMapping,
    RangeMapping,
};
pub use text::{TextSnapshot, split_lines};
