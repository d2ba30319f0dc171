//! Convenience re-exports for common usage
//!
//! ```rust
//! use tide_sheets::prelude::*;
//! ```

pub use crate::calculation::WorkbookCalculationExt;
pub use crate::fill::{FillDirection, SheetFillExt};
pub use crate::WorkbookExt;

pub use tide_sheets_core::{
    CellAddress, CellComment, CellError, CellRange, CellValue, Color, Hyperlink, NumberFormat,
    Patch, Style, Workbook, Worksheet,
};

pub use tide_sheets_formula::{evaluate_cell, evaluate_formula, parse_formula, print_formula};

pub use tide_sheets_xlsx::{ReadOptions, WriteOptions, XlsxReader, XlsxWriter};
