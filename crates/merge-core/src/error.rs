use crate::document::DocumentError;
use crate::merge_range::MergeRangeId;
use crate::model::DocumentRole;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by [`crate::MergeEditorModel`] operations.
pub enum MergeError {
    #[error("merge model is not up to date")]
    /// A mutation was requested while a diff is still being computed or has failed.
    NotUpToDate,

    #[error("unknown merge range {0}")]
    /// The id does not name a current merge range.
    UnknownMergeRange(MergeRangeId),

    #[error("merge range {0} was edited by hand; only the base state can be applied")]
    /// A non-base state was requested for a range whose result is unrecognized.
    UnrecognizedResultState(MergeRangeId),

    #[error("merge range {0} does not line up with the result diff")]
    /// A result change overlaps the range and extends past its base region.
    ResultRangeMismatch(MergeRangeId),

    #[error("{0} document was dropped")]
    /// One of the observed documents no longer exists.
    DocumentDropped(DocumentRole),

    #[error("invalid edit: {0}")]
    /// The result document rejected an edit.
    InvalidEdit(#[from] DocumentError),
}
