//! Host text documents.
//!
//! A [`TextDocument`] is the mutable document the merge model observes: the base and side
//! documents are only read, while the result document is edited through atomic multi-edits,
//! undo checkpoints and whole-content replacement.
//!
//! # Version ids
//!
//! - `version_id` increases on every content change, including undo and redo.
//! - `alternative_version_id` identifies the *content state* in the undo history: a new edit sets
//!   it to the fresh `version_id`, while undo and redo restore the id of the state they return
//!   to. Two states with equal alternative version ids have equal content.

use crate::delta::{ContentChange, ContentChangeEvent, ContentChangeReceiver};
use crate::line_ending::LineEnding;
use crate::position::{CharRange, Position};
use crate::range_editing::RangeEdit;
use crate::text::{TextSnapshot, normalize_newlines};
use ropey::Rope;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;
use thiserror::Error;

/// A document shared between the host and the merge model.
pub type SharedDocument = Rc<RefCell<TextDocument>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors returned by document edits.
pub enum DocumentError {
    #[error("overlapping edits: {first} and {second}")]
    /// Two edits of one operation overlap.
    OverlappingEdits {
        /// The earlier edit's range.
        first: CharRange,
        /// The later edit's range.
        second: CharRange,
    },

    #[error("nothing to undo")]
    /// The undo stack is empty.
    NothingToUndo,

    #[error("nothing to redo")]
    /// The redo stack is empty.
    NothingToRedo,
}

#[derive(Debug, Clone)]
struct TextEdit {
    start_before: usize,
    start_after: usize,
    deleted_text: String,
    inserted_text: String,
}

impl TextEdit {
    fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }
}

#[derive(Debug, Clone)]
struct UndoStep {
    group_id: usize,
    /// Ordered by ascending `start_before`.
    edits: Vec<TextEdit>,
    alternative_before: u64,
    alternative_after: u64,
}

#[derive(Debug, Default)]
struct UndoRedoManager {
    undo_stack: Vec<UndoStep>,
    redo_stack: Vec<UndoStep>,
    next_group_id: usize,
    open_group_id: Option<usize>,
}

impl UndoRedoManager {
    fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn end_group(&mut self) {
        self.open_group_id = None;
    }

    fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.open_group_id = None;
    }

    /// Push a step, joining the open group if there is one.
    fn push_step(&mut self, mut step: UndoStep) {
        self.redo_stack.clear();

        step.group_id = match self.open_group_id {
            Some(group_id) => group_id,
            None => {
                let group_id = self.next_group_id;
                self.next_group_id = self.next_group_id.wrapping_add(1);
                group_id
            }
        };
        self.open_group_id = Some(step.group_id);
        self.undo_stack.push(step);
    }

    /// Pop the newest group (newest step first).
    fn pop_undo_group(&mut self) -> Option<Vec<UndoStep>> {
        let last_group_id = self.undo_stack.last().map(|s| s.group_id)?;
        let mut steps = Vec::new();
        while self
            .undo_stack
            .last()
            .is_some_and(|step| step.group_id == last_group_id)
        {
            steps.extend(self.undo_stack.pop());
        }
        Some(steps)
    }

    /// Pop the next redo group (oldest step first).
    fn pop_redo_group(&mut self) -> Option<Vec<UndoStep>> {
        let last_group_id = self.redo_stack.last().map(|s| s.group_id)?;
        let mut steps = Vec::new();
        while self
            .redo_stack
            .last()
            .is_some_and(|step| step.group_id == last_group_id)
        {
            steps.extend(self.redo_stack.pop());
        }
        Some(steps)
    }
}

/// A rope-backed text document with undo history and change notifications.
#[derive(Debug)]
pub struct TextDocument {
    rope: Rope,
    line_ending: LineEnding,
    version_id: u64,
    alternative_version_id: u64,
    undo_redo: UndoRedoManager,
    subscribers: Vec<mpsc::Sender<ContentChangeEvent>>,
}

impl TextDocument {
    /// Create a document. CRLF and CR line breaks are normalized to LF.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(&normalize_newlines(text)),
            line_ending: LineEnding::detect_in_text(text),
            version_id: 1,
            alternative_version_id: 1,
            undo_redo: UndoRedoManager::default(),
            subscribers: Vec::new(),
        }
    }

    /// Create a document wrapped for sharing with the merge model.
    pub fn shared(text: &str) -> SharedDocument {
        Rc::new(RefCell::new(Self::new(text)))
    }

    /// Full text (LF line breaks).
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Full text with the document's own line ending.
    pub fn text_with_line_ending(&self) -> String {
        self.line_ending.apply_to_text(&self.text())
    }

    /// Number of lines (always at least 1).
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line content without its line break.
    ///
    /// # Panics
    ///
    /// Panics if `line` is out of bounds.
    pub fn line(&self, line: usize) -> String {
        let mut text = self.rope.line(line).to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        text
    }

    /// Length of a line in characters, without its line break.
    pub fn line_length(&self, line: usize) -> usize {
        let slice = self.rope.line(line);
        let len = slice.len_chars();
        if line + 1 < self.rope.len_lines() {
            len - 1
        } else {
            len
        }
    }

    /// All lines.
    pub fn lines(&self) -> Vec<String> {
        (0..self.line_count()).map(|line| self.line(line)).collect()
    }

    /// Immutable snapshot of the current content.
    pub fn snapshot(&self) -> TextSnapshot {
        TextSnapshot::new(self.lines(), self.version_id)
    }

    /// Version id, bumped by every content change.
    pub fn version_id(&self) -> u64 {
        self.version_id
    }

    /// Alternative version id (see the module docs).
    pub fn alternative_version_id(&self) -> u64 {
        self.alternative_version_id
    }

    /// Line ending detected when the content was loaded.
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Subscribe to content change notifications.
    pub fn subscribe(&mut self) -> ContentChangeReceiver {
        let (tx, rx) = ContentChangeReceiver::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Returns `true` if there is something to undo.
    pub fn can_undo(&self) -> bool {
        self.undo_redo.can_undo()
    }

    /// Returns `true` if there is something to redo.
    pub fn can_redo(&self) -> bool {
        self.undo_redo.can_redo()
    }

    /// Close the open undo group, so the next edit starts a new undoable step.
    pub fn push_stack_element(&mut self) {
        self.undo_redo.end_group();
    }

    /// Apply several edits atomically as one undoable step.
    ///
    /// Edit ranges refer to the document before any of the edits; positions are clamped into the
    /// document. The step joins the open undo group, if any. No-op edits are dropped, and an
    /// operation consisting only of no-ops changes nothing.
    pub fn push_edit_operations(
        &mut self,
        edits: impl IntoIterator<Item = RangeEdit>,
    ) -> Result<(), DocumentError> {
        let mut resolved: Vec<(CharRange, usize, usize, String)> = edits
            .into_iter()
            .map(|edit| {
                let start = self.validate_position(edit.range.start);
                let end = self.validate_position(edit.range.end);
                let range = CharRange::new(start, end);
                let new_text = normalize_newlines(&edit.new_text);
                (
                    range,
                    self.position_to_char(range.start),
                    self.position_to_char(range.end),
                    new_text,
                )
            })
            .filter(|(_, start, end, text)| start != end || !text.is_empty())
            .collect();
        resolved.sort_by_key(|(_, start, end, _)| (*start, *end));

        for pair in resolved.windows(2) {
            if pair[0].2 > pair[1].1 {
                return Err(DocumentError::OverlappingEdits {
                    first: pair[0].0,
                    second: pair[1].0,
                });
            }
        }
        if resolved.is_empty() {
            return Ok(());
        }

        let mut shift: isize = 0;
        let edits: Vec<TextEdit> = resolved
            .into_iter()
            .map(|(_, start, end, inserted_text)| {
                let edit = TextEdit {
                    start_before: start,
                    start_after: start.saturating_add_signed(shift),
                    deleted_text: self.rope.slice(start..end).to_string(),
                    inserted_text,
                };
                shift += edit.inserted_len() as isize - edit.deleted_len() as isize;
                edit
            })
            .collect();

        let changes = self.apply_forward(&edits);
        let alternative_before = self.alternative_version_id;
        self.version_id += 1;
        self.alternative_version_id = self.version_id;
        self.undo_redo.push_step(UndoStep {
            group_id: 0,
            edits,
            alternative_before,
            alternative_after: self.alternative_version_id,
        });

        self.emit(changes, false, false, false);
        Ok(())
    }

    /// Replace the whole content. Not undoable: clears the undo history.
    pub fn set_value(&mut self, text: &str) {
        let whole = CharRange::new(
            Position::new(0, 0),
            self.char_to_position(self.rope.len_chars()),
        );
        let normalized = normalize_newlines(text);
        self.rope = Rope::from_str(&normalized);
        self.line_ending = LineEnding::detect_in_text(text);
        self.undo_redo.clear();
        self.version_id += 1;
        self.alternative_version_id = self.version_id;

        let changes = vec![ContentChange {
            range: whole,
            text: normalized,
        }];
        self.emit(changes, false, false, true);
    }

    /// Undo the newest undo group.
    pub fn undo(&mut self) -> Result<(), DocumentError> {
        self.undo_redo.end_group();
        let steps = self
            .undo_redo
            .pop_undo_group()
            .ok_or(DocumentError::NothingToUndo)?;

        let mut changes = Vec::new();
        for step in &steps {
            changes.extend(self.apply_backward(&step.edits));
        }
        if let Some(oldest) = steps.last() {
            self.alternative_version_id = oldest.alternative_before;
        }
        self.version_id += 1;

        // Newest first; redo pops the oldest first.
        self.undo_redo.redo_stack.extend(steps);
        self.emit(changes, true, false, false);
        Ok(())
    }

    /// Redo the next redo group.
    pub fn redo(&mut self) -> Result<(), DocumentError> {
        self.undo_redo.end_group();
        let steps = self
            .undo_redo
            .pop_redo_group()
            .ok_or(DocumentError::NothingToRedo)?;

        let mut changes = Vec::new();
        for step in &steps {
            changes.extend(self.apply_forward(&step.edits));
        }
        if let Some(newest) = steps.last() {
            self.alternative_version_id = newest.alternative_after;
        }
        self.version_id += 1;

        self.undo_redo.undo_stack.extend(steps);
        self.emit(changes, false, true, false);
        Ok(())
    }

    /// Clamp a position into the document.
    pub fn validate_position(&self, position: Position) -> Position {
        let last_line = self.line_count() - 1;
        if position.line > last_line {
            return Position::new(last_line, self.line_length(last_line));
        }
        Position::new(
            position.line,
            position.column.min(self.line_length(position.line)),
        )
    }

    /// Apply edits in descending order so every reported range is in pre-step coordinates.
    fn apply_forward(&mut self, edits: &[TextEdit]) -> Vec<ContentChange> {
        let mut changes = Vec::with_capacity(edits.len());
        for edit in edits.iter().rev() {
            let start = edit.start_before;
            let end = start + edit.deleted_len();
            changes.push(ContentChange {
                range: CharRange::new(self.char_to_position(start), self.char_to_position(end)),
                text: edit.inserted_text.clone(),
            });
            self.rope.remove(start..end);
            self.rope.insert(start, &edit.inserted_text);
        }
        changes
    }

    fn apply_backward(&mut self, edits: &[TextEdit]) -> Vec<ContentChange> {
        let mut changes = Vec::with_capacity(edits.len());
        for edit in edits.iter().rev() {
            let start = edit.start_after;
            let end = start + edit.inserted_len();
            changes.push(ContentChange {
                range: CharRange::new(self.char_to_position(start), self.char_to_position(end)),
                text: edit.deleted_text.clone(),
            });
            self.rope.remove(start..end);
            self.rope.insert(start, &edit.deleted_text);
        }
        changes
    }

    fn emit(
        &mut self,
        changes: Vec<ContentChange>,
        is_undoing: bool,
        is_redoing: bool,
        is_flush: bool,
    ) {
        let event = ContentChangeEvent {
            changes,
            is_undoing,
            is_redoing,
            is_flush,
            version_id: self.version_id,
            alternative_version_id: self.alternative_version_id,
        };
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn position_to_char(&self, position: Position) -> usize {
        self.rope.line_to_char(position.line) + position.column
    }

    fn char_to_position(&self, char_offset: usize) -> Position {
        let char_offset = char_offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(char_offset);
        Position::new(line, char_offset - self.rope.line_to_char(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn edit(sl: usize, sc: usize, el: usize, ec: usize, text: &str) -> RangeEdit {
        RangeEdit::new(
            CharRange::new(Position::new(sl, sc), Position::new(el, ec)),
            text,
        )
    }

    #[test]
    fn test_crlf_is_normalized() {
        let document = TextDocument::new("a\r\nb\r\n");
        assert_eq!(document.lines(), vec!["a", "b", ""]);
        assert_eq!(document.line_ending(), LineEnding::Crlf);
        assert_eq!(document.text_with_line_ending(), "a\r\nb\r\n");
    }

    #[test]
    fn test_only_lf_breaks_lines() {
        let document = TextDocument::new("a\u{2028}b\u{2029}c\u{85}d\x0Be\x0Cf\ng");
        assert_eq!(document.line_count(), 2);
        assert_eq!(document.line(0), "a\u{2028}b\u{2029}c\u{85}d\x0Be\x0Cf");
        assert_eq!(document.line_length(0), 11);
        assert_eq!(document.snapshot().text(), "a\u{2028}b\u{2029}c\u{85}d\x0Be\x0Cf\ng");
    }

    #[test]
    fn test_multi_edit_uses_pre_edit_coordinates() {
        let mut document = TextDocument::new("one\ntwo\nthree");
        document
            .push_edit_operations([edit(0, 0, 0, 3, "1"), edit(2, 0, 2, 5, "3")])
            .unwrap();
        assert_eq!(document.text(), "1\ntwo\n3");
    }

    #[test]
    fn test_overlapping_edits_are_rejected() {
        let mut document = TextDocument::new("abcdef");
        let err = document
            .push_edit_operations([edit(0, 0, 0, 3, "x"), edit(0, 2, 0, 4, "y")])
            .unwrap_err();
        assert!(matches!(err, DocumentError::OverlappingEdits { .. }));
        assert_eq!(document.text(), "abcdef");
        assert_eq!(document.version_id(), 1);
    }

    #[test]
    fn test_undo_redo_restore_alternative_version_ids() {
        let mut document = TextDocument::new("a");
        let initial = document.alternative_version_id();

        document.push_edit_operations([edit(0, 1, 0, 1, "b")]).unwrap();
        document.push_stack_element();
        let after_first = document.alternative_version_id();
        assert_ne!(after_first, initial);

        document.undo().unwrap();
        assert_eq!(document.text(), "a");
        assert_eq!(document.alternative_version_id(), initial);

        document.redo().unwrap();
        assert_eq!(document.text(), "ab");
        assert_eq!(document.alternative_version_id(), after_first);
        assert!(document.version_id() > after_first);
    }

    #[test]
    fn test_edits_coalesce_until_stack_element() {
        let mut document = TextDocument::new("");
        document.push_edit_operations([edit(0, 0, 0, 0, "a")]).unwrap();
        document.push_edit_operations([edit(0, 1, 0, 1, "b")]).unwrap();
        document.push_stack_element();
        document.push_edit_operations([edit(0, 2, 0, 2, "c")]).unwrap();

        document.undo().unwrap();
        assert_eq!(document.text(), "ab");
        document.undo().unwrap();
        assert_eq!(document.text(), "");
        assert!(!document.can_undo());
        assert_eq!(document.undo(), Err(DocumentError::NothingToUndo));
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut document = TextDocument::new("x");
        document.push_edit_operations([edit(0, 0, 0, 1, "y")]).unwrap();
        document.undo().unwrap();
        assert!(document.can_redo());
        document.push_edit_operations([edit(0, 0, 0, 1, "z")]).unwrap();
        assert!(!document.can_redo());
    }

    #[test]
    fn test_set_value_flushes_history_and_notifies() {
        let mut document = TextDocument::new("old");
        let rx = document.subscribe();
        document.push_edit_operations([edit(0, 0, 0, 0, ">")]).unwrap();
        document.set_value("new\r\ntext");

        assert!(!document.can_undo());
        assert_eq!(document.lines(), vec!["new", "text"]);

        let events = rx.drain();
        assert_eq!(events.len(), 2);
        assert!(!events[0].is_flush);
        assert_eq!(
            events[0].changes,
            vec![ContentChange {
                range: CharRange::collapsed(Position::new(0, 0)),
                text: ">".to_string(),
            }]
        );
        assert!(events[1].is_flush);
        assert_eq!(events[1].version_id, document.version_id());
    }

    #[test]
    fn test_undo_event_flags_and_ranges() {
        let mut document = TextDocument::new("a\nb");
        let rx = document.subscribe();
        document.push_edit_operations([edit(1, 0, 1, 1, "xyz")]).unwrap();
        document.undo().unwrap();

        let events = rx.drain();
        let undo = &events[1];
        assert!(undo.is_undoing);
        assert_eq!(
            undo.changes,
            vec![ContentChange {
                range: CharRange::new(Position::new(1, 0), Position::new(1, 3)),
                text: "b".to_string(),
            }]
        );
        assert_eq!(document.text(), "a\nb");
    }

    #[test]
    fn test_positions_are_clamped() {
        let mut document = TextDocument::new("ab\ncd");
        document
            .push_edit_operations([edit(0, usize::MAX, 9, 0, "!")])
            .unwrap();
        assert_eq!(document.text(), "ab!");
    }

    #[test]
    fn test_dropped_receiver_unsubscribes() {
        let mut document = TextDocument::new("");
        drop(document.subscribe());
        document.set_value("x");
        assert!(document.subscribers.is_empty());
    }
}
