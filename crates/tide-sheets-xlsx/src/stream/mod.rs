//! Streaming I/O: constant-memory row-oriented reading and writing

mod reader;
mod writer;

pub use reader::{stream_rows, RowStream, SheetSelector};
pub use writer::{
    write_streaming, ColumnWidthStrategy, RowData, SharedStringsMode, SheetStream,
    StreamWriteOptions,
};
