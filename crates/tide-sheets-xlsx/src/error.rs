//! XLSX error types

use thiserror::Error;

/// Result type for XLSX operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur during XLSX reading/writing
#[derive(Debug, Error)]
pub enum XlsxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Malformed XML within a package part
    #[error("XML error in {part} at byte {position}: {message}")]
    XmlParse {
        part: String,
        position: u64,
        message: String,
    },

    /// The package has no [Content_Types].xml
    #[error("Missing [Content_Types].xml: not an OOXML package")]
    MissingContentTypes,

    /// The package has no workbook part
    #[error("Missing workbook part (xl/workbook.xml)")]
    MissingWorkbookPart,

    /// Some other required part is missing
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// An entry's compression ratio exceeds the configured limit
    #[error("Zip bomb suspected: entry '{path}' has compression ratio {ratio:.0}")]
    ZipBombDetected { path: String, ratio: f64 },

    /// The declared uncompressed size exceeds the configured budget
    #[error("Declared uncompressed size {declared} exceeds the budget of {budget} bytes")]
    DeclaredSizeExceeded { declared: u64, budget: u64 },

    /// Structurally invalid content
    #[error("Invalid XLSX format: {0}")]
    InvalidFormat(String),

    /// Streaming rows arrived out of order
    #[error("Row {row} out of order: rows must be written in ascending order (last was {last})")]
    RowOutOfOrder { row: u32, last: u32 },

    /// Core model error
    #[error("Core error: {0}")]
    Core(#[from] tide_sheets_core::Error),
}
