//! # tide-sheets
//!
//! A Rust library for reading, mutating, and writing Microsoft Excel
//! `.xlsx` workbooks with deterministic output.
//!
//! ## Features
//!
//! - Read and write XLSX files (Office Open XML) with byte-identical
//!   output for identical inputs
//! - Composable first-class edits ([`Patch`]) applied by a single
//!   evaluator
//! - A typed formula engine: parser, printer, anchor-aware shifting,
//!   dependency graph with cycle detection, and evaluation
//! - Streaming read and write paths with constant memory in the row count
//! - Cell styling (fonts, fills, borders, number formats) with per-sheet
//!   deduplicating registries
//!
//! ## Example
//!
//! ```rust
//! use tide_sheets::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.sheet_mut(0).unwrap();
//!
//! sheet.set_value("A1", "Hello").unwrap();
//! sheet.set_value("B1", 42.0).unwrap();
//! sheet.set_formula("C1", "=B1*2").unwrap();
//!
//! // workbook.save("output.xlsx").unwrap();
//! ```

pub mod calculation;
pub mod fill;
pub mod prelude;

pub use calculation::WorkbookCalculationExt;
pub use fill::{FillDirection, SheetFillExt};

// Re-export core types
pub use tide_sheets_core::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, CellAddress, CellComment, CellData,
    CellError, CellRange, CellValue, CodecError, Color, ColumnProperties, DocumentProperties,
    Error, FillStyle, FontStyle, FreezePanes, FromCellValue, HorizontalAlignment, Hyperlink,
    NumberFormat, ParsedRef, Patch, PatternType, PreservedPart, Result, RichTextRun,
    RowProperties, SharedString, Style, StylePool, ToCellValue, VerticalAlignment, Workbook,
    WorkbookSettings, Worksheet, MAX_CELL_TEXT_LEN, MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN,
};

// Re-export the formula engine
pub use tide_sheets_formula::{
    evaluate, evaluate_cell, evaluate_formula, evaluate_with_dependency_check, parse_formula,
    print_formula, shift_formula, CellKey, DependencyGraph, EvalContext, Expr, FormulaError,
    FormulaResult, FormulaValue, ParseErrorKind,
};

// Re-export I/O types
pub use tide_sheets_xlsx::{
    stream_rows, write_streaming, ColumnWidthStrategy, ReadOptions, RowData, RowStream,
    SharedStringsMode, SheetSelector, SheetStream, StreamWriteOptions, WriteOptions, XlsxError,
    XlsxReader, XlsxResult, XlsxWriter,
};

use std::path::Path;

/// Extension trait for Workbook file I/O
pub trait WorkbookExt: Sized {
    /// Open a workbook from an `.xlsx` file
    fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self>;

    /// Open with explicit reader limits
    fn open_with_options<P: AsRef<Path>>(path: P, options: &ReadOptions) -> XlsxResult<Self>;

    /// Save the workbook to an `.xlsx` file
    fn save<P: AsRef<Path>>(&self, path: P) -> XlsxResult<()>;

    /// Save with explicit writer options
    fn save_with_options<P: AsRef<Path>>(&self, path: P, options: &WriteOptions)
        -> XlsxResult<()>;
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        XlsxReader::read_file(path)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, options: &ReadOptions) -> XlsxResult<Self> {
        XlsxReader::read_file_with_options(path, options)
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> XlsxResult<()> {
        XlsxWriter::write_file(self, path, &WriteOptions::default())
    }

    fn save_with_options<P: AsRef<Path>>(
        &self,
        path: P,
        options: &WriteOptions,
    ) -> XlsxResult<()> {
        XlsxWriter::write_file(self, path, options)
    }
}
