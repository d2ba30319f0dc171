//! Streaming reader
//!
//! Parses the shared strings table up front (cost proportional to the
//! number of distinct strings), then scans the selected worksheet part
//! event by event, yielding one [`RowData`] at a time in ascending row
//! order. The worksheet entry is decompressed once into an unlinked temp
//! spool, so memory stays constant in the row count and dropping the
//! stream releases everything.

use std::fs::File;
use std::io::{self, BufReader, Seek, SeekFrom};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::package::{check_archive_limits, decode_excel_escapes, part, ReadOptions};
use crate::reader::XlsxReader;
use crate::stream::writer::RowData;
use tide_sheets_core::serial::serial_to_datetime;
use tide_sheets_core::{CellAddress, CellError, CellValue};

/// Which sheet to stream
#[derive(Debug, Clone)]
pub enum SheetSelector {
    /// By position in workbook order
    Index(usize),
    /// By name
    Name(String),
}

/// Open a workbook and stream one sheet's rows.
///
/// The stream is a single-consumer pull iterator; dropping it cancels the
/// scan and releases the underlying file handles.
pub fn stream_rows<P: AsRef<Path>>(
    path: P,
    sheet: SheetSelector,
    options: &ReadOptions,
) -> XlsxResult<RowStream> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    check_archive_limits(&mut archive, options)?;

    if archive.by_name(part::CONTENT_TYPES).is_err() {
        return Err(XlsxError::MissingContentTypes);
    }
    if archive.by_name(part::WORKBOOK).is_err() {
        return Err(XlsxError::MissingWorkbookPart);
    }

    // Pre-parse the SST and styles, then locate the worksheet part
    let shared_strings = read_plain_shared_strings(&mut archive)?;
    let date_flags = read_date_flags(&mut archive)?;
    let (sheet_info, date_1904, _) = XlsxReader::read_workbook_info(&mut archive)?;
    let targets = XlsxReader::read_worksheet_targets(&mut archive)?;

    let (name, r_id) = match &sheet {
        SheetSelector::Index(i) => sheet_info
            .get(*i)
            .ok_or_else(|| XlsxError::InvalidFormat(format!("no sheet at index {}", i)))?,
        SheetSelector::Name(name) => sheet_info
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| XlsxError::InvalidFormat(format!("no sheet named '{}'", name)))?,
    };

    let part_path = targets
        .get(r_id)
        .ok_or_else(|| XlsxError::MissingPart(format!("worksheet part for sheet '{}'", name)))?;

    // Decompress the worksheet once into an unlinked spool; the zip entry
    // reader borrows the archive, the spool does not
    let mut spool = tempfile::tempfile()?;
    {
        let mut entry = archive.by_name(part_path)?;
        io::copy(&mut entry, &mut spool)?;
    }
    spool.seek(SeekFrom::Start(0))?;

    let mut xml = Reader::from_reader(BufReader::new(spool));
    xml.trim_text(false);

    Ok(RowStream {
        xml,
        part: part_path.clone(),
        shared_strings,
        date_flags,
        date_1904,
        buf: Vec::new(),
        done: false,
    })
}

/// Lazy, single-consumer stream of worksheet rows.
///
/// An error terminates the stream: after yielding `Err`, the iterator
/// fuses and returns `None`.
pub struct RowStream {
    xml: Reader<BufReader<File>>,
    part: String,
    shared_strings: Vec<String>,
    date_flags: Vec<bool>,
    date_1904: bool,
    buf: Vec<u8>,
    done: bool,
}

impl Iterator for RowStream {
    type Item = XlsxResult<RowData>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.scan_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl RowStream {
    /// Scan forward to the next complete `<row>` element
    fn scan_row(&mut self) -> XlsxResult<Option<RowData>> {
        let mut current: Option<RowData> = None;

        // Cell state
        let mut cell_ref: Option<CellAddress> = None;
        let mut cell_type: Option<String> = None;
        let mut cell_style: usize = 0;
        let mut value_text = String::new();
        let mut has_formula = false;
        let mut in_value = false;
        let mut in_inline_text = false;
        let mut inline_text = String::new();

        loop {
            self.buf.clear();
            let event = self
                .xml
                .read_event_into(&mut self.buf)
                .map_err(|e| XlsxError::XmlParse {
                    part: self.part.clone(),
                    position: self.xml.buffer_position() as u64,
                    message: e.to_string(),
                })?;

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    match e.name().as_ref() {
                        b"row" => {
                            let row = attr(e, b"r")
                                .and_then(|v| v.parse::<u32>().ok())
                                .map(|r| r - 1)
                                .unwrap_or(0);
                            if is_empty {
                                return Ok(Some(RowData::new(row)));
                            }
                            current = Some(RowData::new(row));
                        }
                        b"c" if current.is_some() => {
                            cell_ref = attr(e, b"r").and_then(|v| CellAddress::parse(&v).ok());
                            cell_type = attr(e, b"t");
                            cell_style = attr(e, b"s")
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0);
                            value_text.clear();
                            inline_text.clear();
                            has_formula = false;

                            if is_empty {
                                cell_ref = None;
                            }
                        }
                        b"v" if !is_empty => in_value = true,
                        b"f" => has_formula = true,
                        b"t" if !is_empty => in_inline_text = true,
                        _ => {}
                    }
                }

                Event::Text(e) => {
                    if let Ok(text) = e.unescape() {
                        if in_value {
                            value_text.push_str(&text);
                        } else if in_inline_text {
                            inline_text.push_str(&text);
                        }
                    }
                }

                Event::End(e) => match e.name().as_ref() {
                    b"v" => in_value = false,
                    b"t" => in_inline_text = false,
                    b"c" => {
                        if let (Some(addr), Some(row)) = (cell_ref.take(), current.as_mut()) {
                            let value = self.decode_cell(
                                cell_type.as_deref(),
                                cell_style,
                                &value_text,
                                &inline_text,
                                has_formula,
                            );
                            if !value.is_empty() {
                                row.cells.insert(addr.col, value);
                            }
                        }
                    }
                    b"row" => return Ok(current),
                    _ => {}
                },

                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    fn decode_cell(
        &self,
        cell_type: Option<&str>,
        style: usize,
        value_text: &str,
        inline_text: &str,
        has_formula: bool,
    ) -> CellValue {
        let type_str = cell_type.unwrap_or("n");
        let is_date = self.date_flags.get(style).copied().unwrap_or(false);

        // In the streaming path formulas surface as their cached values
        if has_formula && value_text.is_empty() {
            return CellValue::Empty;
        }

        match type_str {
            "s" => {
                let idx: usize = value_text.parse().unwrap_or(usize::MAX);
                self.shared_strings
                    .get(idx)
                    .map(|s| CellValue::text(s.clone()))
                    .unwrap_or(CellValue::Empty)
            }
            "inlineStr" => CellValue::text(decode_excel_escapes(inline_text)),
            "str" => CellValue::text(value_text),
            "b" => CellValue::Boolean(value_text == "1"),
            "e" => CellError::from_str(value_text)
                .map(CellValue::Error)
                .unwrap_or(CellValue::Empty),
            _ => match value_text.parse::<f64>() {
                Ok(n) if is_date => serial_to_datetime(n, self.date_1904)
                    .map(CellValue::DateTime)
                    .unwrap_or(CellValue::Number(n)),
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Empty,
            },
        }
    }
}

/// SST as plain strings (rich text flattens to its concatenated runs)
fn read_plain_shared_strings(
    archive: &mut zip::ZipArchive<File>,
) -> XlsxResult<Vec<String>> {
    let file = match archive.by_name(part::SHARED_STRINGS) {
        Ok(f) => f,
        Err(_) => return Ok(Vec::new()),
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(false);

    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;

    loop {
        let event = xml
            .read_event_into(&mut buf)
            .map_err(|e| XlsxError::XmlParse {
                part: part::SHARED_STRINGS.into(),
                position: xml.buffer_position() as u64,
                message: e.to_string(),
            })?;

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Event::Text(e) if in_t => {
                if let Ok(text) = e.unescape() {
                    current.push_str(&text);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"si" => {
                    strings.push(decode_excel_escapes(&current));
                    in_si = false;
                }
                b"t" => in_t = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Just the per-xf date flags from styles.xml
fn read_date_flags(archive: &mut zip::ZipArchive<File>) -> XlsxResult<Vec<bool>> {
    match archive.by_name(part::STYLES) {
        Ok(file) => {
            let parsed = crate::styles::read_styles_xml(BufReader::new(file), part::STYLES)?;
            Ok(parsed.date_flags)
        }
        Err(_) => Ok(vec![false]),
    }
}

fn attr(e: &quick_xml::events::BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.to_string())
}
