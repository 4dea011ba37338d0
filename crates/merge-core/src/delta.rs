//! Structured content change notifications.
//!
//! Every mutation of a [`crate::TextDocument`] is broadcast to its subscribers as one
//! [`ContentChangeEvent`]. Ranges are expressed in the coordinates of the document **before** the
//! event, in line/column form (columns count Unicode scalar values).
//!
//! Delivery uses `std::sync::mpsc` channels: subscribers hold a [`ContentChangeReceiver`] and
//! drain it at their own pace. Dropping the receiver unsubscribes.

use crate::position::CharRange;
use std::sync::mpsc;

/// A single replaced range inside a content change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    /// Replaced range, in pre-event coordinates.
    pub range: CharRange,
    /// Inserted text (may be empty).
    pub text: String,
}

/// A document content change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChangeEvent {
    /// Replaced ranges, ordered by descending start position.
    pub changes: Vec<ContentChange>,
    /// The change was produced by an undo.
    pub is_undoing: bool,
    /// The change was produced by a redo.
    pub is_redoing: bool,
    /// The whole content was replaced and the undo history cleared.
    pub is_flush: bool,
    /// Document version after the change.
    pub version_id: u64,
    /// Alternative version id after the change.
    pub alternative_version_id: u64,
}

/// Receiving end of a document subscription.
#[derive(Debug)]
pub struct ContentChangeReceiver {
    rx: mpsc::Receiver<ContentChangeEvent>,
}

impl ContentChangeReceiver {
    pub(crate) fn channel() -> (mpsc::Sender<ContentChangeEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }

    /// Try to receive the next event without blocking.
    pub fn try_recv(&self) -> Option<ContentChangeEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain every pending event.
    pub fn drain(&self) -> Vec<ContentChangeEvent> {
        self.rx.try_iter().collect()
    }
}
