//! # tide-sheets-core
//!
//! Core data structures for the tide-sheets spreadsheet library.
//!
//! This crate provides the fundamental types used throughout tide-sheets:
//! - [`CellValue`] - Cell contents (numbers, text, booleans, dates, errors, formulas)
//! - [`CellAddress`] and [`CellRange`] - Cell addressing and ranges
//! - [`Style`] and [`StylePool`] - Cell formatting and the per-sheet registry
//! - [`Patch`] - Composable first-class edits
//! - [`Workbook`], [`Worksheet`] - The main document structures
//!
//! ## Example
//!
//! ```rust
//! use tide_sheets_core::{Workbook, CellValue};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.sheet_mut(0).unwrap();
//!
//! // Using string addresses
//! sheet.set_value("A1", "Hello").unwrap();
//! sheet.set_value("B1", 42.0).unwrap();
//!
//! // Or using row/column indices (0-based)
//! sheet.set_value_at(1, 0, CellValue::text("World")).unwrap();
//! ```

pub mod cell;
pub mod codec;
pub mod comment;
pub mod error;
pub mod patch;
pub mod serial;
pub mod sheet;
pub mod style;
pub mod workbook;

// Re-exports for convenience
pub use cell::{
    column_from_letters, column_to_letters, CellAddress, CellData, CellError, CellRange,
    CellValue, Hyperlink, ParsedRef, RichTextRun, SharedString, StringPool,
};
pub use codec::{CodecError, FromCellValue, ToCellValue};
pub use comment::CellComment;
pub use error::{Error, Result};
pub use patch::Patch;
pub use sheet::{ColumnProperties, FreezePanes, RowProperties, Worksheet};
pub use workbook::{DocumentProperties, PreservedPart, Workbook, WorkbookSettings};

// Re-export all style types for convenience
pub use style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, NumberFormat, PatternType, Style, StylePool, VerticalAlignment,
};

/// Maximum number of rows in a worksheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name in characters
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Maximum number of characters in a single cell
pub const MAX_CELL_TEXT_LEN: usize = 32_767;
