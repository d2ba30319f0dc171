//! Error types for tide-sheets-core

use thiserror::Error;

use crate::codec::CodecError;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tide-sheets-core
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid column letters
    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    /// Invalid row number
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// Invalid cell reference format
    #[error("Invalid cell reference '{input}': {reason}")]
    InvalidCellRef { input: String, reason: String },

    /// Invalid cell range format
    #[error("Invalid cell range '{input}': {reason}")]
    InvalidRange { input: String, reason: String },

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u16, u16),

    /// Sheet index out of bounds
    #[error("Sheet index {0} out of bounds (count: {1})")]
    SheetOutOfBounds(usize, usize),

    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Invalid sheet name
    #[error("Invalid sheet name '{name}': {reason}")]
    InvalidSheetName { name: String, reason: String },

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Deleting the last remaining sheet is not allowed
    #[error("Cannot delete the last sheet in a workbook")]
    DeleteLastSheet,

    /// Merged region conflict (overlap or out of bounds)
    #[error("Cannot merge {0}: {1}")]
    MergeConflict(String, String),

    /// A patch operation failed
    #[error("Patch operation '{op}' failed: {source}")]
    PatchFailed {
        op: String,
        #[source]
        source: Box<Error>,
    },

    /// Typed cell codec failure
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Fill source/target shape mismatch
    #[error("Invalid fill: {0}")]
    InvalidFill(String),
}
