//! # tide-sheets-xlsx
//!
//! XLSX (Office Open XML) reader and writer for tide-sheets.
//!
//! Three I/O paths:
//! - [`XlsxReader`]/[`XlsxWriter`]: whole-workbook, random-access
//! - [`stream::write_streaming`]: two-phase streaming writer with O(1)
//!   memory in the row count
//! - [`stream::stream_rows`]: event-driven row reader
//!
//! The writer is deterministic: identical workbook values produce
//! identical bytes.

pub mod error;
pub mod package;
pub mod reader;
pub mod stream;
pub mod writer;

mod styles;

pub use error::{XlsxError, XlsxResult};
pub use package::{ReadOptions, WriteOptions};
pub use reader::XlsxReader;
pub use stream::{
    stream_rows, write_streaming, ColumnWidthStrategy, RowData, RowStream, SharedStringsMode,
    SheetSelector, SheetStream, StreamWriteOptions,
};
pub use writer::XlsxWriter;
