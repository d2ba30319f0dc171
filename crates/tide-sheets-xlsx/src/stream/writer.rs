//! Two-phase streaming writer
//!
//! Phase 1 consumes each sheet's rows once, spooling a compact binary
//! encoding to a temp file while the shared-strings table and per-column
//! width statistics accumulate. Phase 2 re-streams each spool into
//! worksheet XML with the finalized string indices and column widths.
//!
//! Peak memory is O(1) in the row count; only the SST (and declared
//! styles) grow with input. Temp files are removed on success and on
//! failure alike (they are unlinked on creation).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use ahash::AHashMap;

use crate::error::{XlsxError, XlsxResult};
use crate::package::{escape_xml, escape_xml_attr, part, zip_entry_options, WriteOptions};
use tide_sheets_core::serial::datetime_to_serial;
use tide_sheets_core::{CellAddress, CellRange, CellValue, NumberFormat, Style};

/// One row of streamed data
#[derive(Debug, Clone, Default)]
pub struct RowData {
    /// 0-based row index
    pub row: u32,
    /// Column -> value, sparse
    pub cells: BTreeMap<u16, CellValue>,
}

impl RowData {
    pub fn new(row: u32) -> Self {
        Self {
            row,
            cells: BTreeMap::new(),
        }
    }

    pub fn set<V: Into<CellValue>>(mut self, col: u16, value: V) -> Self {
        self.cells.insert(col, value.into());
        self
    }
}

/// Where the shared-strings table lives during phase 1
#[derive(Debug, Clone, Default)]
pub enum SharedStringsMode {
    /// No SST; strings are written inline per cell
    Inline,
    /// Dedup table held in memory (the default)
    #[default]
    InMemory,
    /// Dedup index in memory, string bytes spooled to a temp file in the
    /// given directory so phase-2 emission streams from disk
    OnDisk(PathBuf),
}

/// How column widths are decided
#[derive(Debug, Clone, Default)]
pub enum ColumnWidthStrategy {
    /// No explicit widths
    #[default]
    None,
    /// One fixed width for every populated column
    Fixed(f64),
    /// Estimate from the longest rendered value in the first `n` rows
    AutoFitFromSample(usize),
}

/// Streaming writer configuration
#[derive(Debug, Clone, Default)]
pub struct StreamWriteOptions {
    pub shared_strings: SharedStringsMode,
    pub column_widths: ColumnWidthStrategy,
    /// Styles available to the stream; the registry cannot grow once
    /// writing starts
    pub styles: Vec<Style>,
    /// Column -> index into `styles` (plus one; 0 is the default style)
    pub column_styles: AHashMap<u16, u32>,
    /// ZIP options (deflate level, debug mode)
    pub package: WriteOptions,
}

/// One sheet's worth of streamed rows
pub struct SheetStream {
    pub name: String,
    pub rows: Box<dyn Iterator<Item = RowData>>,
    /// Merged regions to emit after the row data
    pub merged_ranges: Vec<CellRange>,
}

impl SheetStream {
    pub fn new<I>(name: impl Into<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = RowData>,
        I::IntoIter: 'static,
    {
        Self {
            name: name.into(),
            rows: Box::new(rows.into_iter()),
            merged_ranges: Vec::new(),
        }
    }

    pub fn with_merged_ranges(mut self, ranges: Vec<CellRange>) -> Self {
        self.merged_ranges = ranges;
        self
    }
}

// Spool record tags
const TAG_NUMBER: u8 = 1;
const TAG_BOOL: u8 = 2;
const TAG_INLINE_STR: u8 = 3;
const TAG_SST: u8 = 4;
const TAG_ERROR: u8 = 5;
const TAG_DATETIME: u8 = 6;
const TAG_FORMULA: u8 = 7;

/// Shared-strings accumulator for the streaming path
struct StreamSst {
    index: AHashMap<String, u32>,
    entries: Vec<String>,
    spool: Option<BufWriter<File>>,
    count: u32,
    total_refs: u64,
}

impl StreamSst {
    fn new(mode: &SharedStringsMode) -> XlsxResult<Self> {
        let spool = match mode {
            SharedStringsMode::OnDisk(dir) => {
                Some(BufWriter::new(tempfile::tempfile_in(dir)?))
            }
            _ => None,
        };
        Ok(Self {
            index: AHashMap::new(),
            entries: Vec::new(),
            spool,
            count: 0,
            total_refs: 0,
        })
    }

    fn intern(&mut self, s: &str) -> XlsxResult<u32> {
        self.total_refs += 1;
        if let Some(&idx) = self.index.get(s) {
            return Ok(idx);
        }

        let idx = self.count;
        self.count += 1;
        self.index.insert(s.to_string(), idx);

        match self.spool.as_mut() {
            Some(spool) => {
                let bytes = s.as_bytes();
                spool.write_all(&(bytes.len() as u32).to_le_bytes())?;
                spool.write_all(bytes)?;
            }
            None => self.entries.push(s.to_string()),
        }

        Ok(idx)
    }

    /// Stream the finalized table into the SST part
    fn emit<W: Write>(mut self, out: &mut W) -> XlsxResult<()> {
        write!(
            out,
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<sst xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" count=\"{}\" uniqueCount=\"{}\">",
            self.total_refs, self.count
        )?;

        match self.spool.take() {
            Some(spool) => {
                let mut file = spool.into_inner().map_err(|e| XlsxError::Io(e.into_error()))?;
                file.seek(SeekFrom::Start(0))?;
                let mut reader = BufReader::new(file);
                for _ in 0..self.count {
                    let mut len_buf = [0u8; 4];
                    reader.read_exact(&mut len_buf)?;
                    let len = u32::from_le_bytes(len_buf) as usize;
                    let mut bytes = vec![0u8; len];
                    reader.read_exact(&mut bytes)?;
                    let s = String::from_utf8_lossy(&bytes);
                    write_si(out, &s)?;
                }
            }
            None => {
                for s in &self.entries {
                    write_si(out, s)?;
                }
            }
        }

        out.write_all(b"</sst>")?;
        Ok(())
    }
}

fn write_si<W: Write>(out: &mut W, text: &str) -> XlsxResult<()> {
    let space = if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        " xml:space=\"preserve\""
    } else {
        ""
    };
    write!(out, "<si><t{}>{}</t></si>", space, escape_xml(text))?;
    Ok(())
}

/// Per-column width statistics for auto-fit
#[derive(Debug, Default)]
struct ColumnStats {
    max_chars: BTreeMap<u16, usize>,
}

impl ColumnStats {
    fn observe(&mut self, col: u16, value: &CellValue) {
        let chars = rendered_width(value);
        let entry = self.max_chars.entry(col).or_insert(0);
        if chars > *entry {
            *entry = chars;
        }
    }

    /// Width estimate: character count plus padding, clamped to the
    /// format's limits. This is the documented headless fallback; no font
    /// metrics are consulted.
    fn width_for(&self, col: u16) -> Option<f64> {
        self.max_chars
            .get(&col)
            .map(|&chars| (chars as f64 + 1.5).clamp(8.43, 255.0))
    }
}

fn rendered_width(value: &CellValue) -> usize {
    match value {
        CellValue::Text(s) => s.as_str().chars().count(),
        CellValue::RichText(_) => value
            .plain_text()
            .map(|t| t.chars().count())
            .unwrap_or(0),
        CellValue::Number(n) => format!("{}", n).len(),
        CellValue::Boolean(true) => 4,
        CellValue::Boolean(false) => 5,
        CellValue::DateTime(_) => 16,
        CellValue::Error(e) => e.as_str().len(),
        CellValue::Formula { .. } | CellValue::Empty => 0,
    }
}

/// Accumulated state for one sheet after phase 1
struct SpooledSheet {
    name: String,
    spool: File,
    row_count: u64,
    last_row: Option<u32>,
    max_col: u16,
    stats: ColumnStats,
    merged_ranges: Vec<CellRange>,
}

/// Write sheets of streamed rows to an XLSX file.
///
/// Rows within a sheet must arrive in ascending row order. Merged ranges
/// declared on a [`SheetStream`] are emitted in the worksheet's
/// `mergeCells` element. The output appears at `path` only on success.
pub fn write_streaming<P: AsRef<Path>>(
    path: P,
    sheets: Vec<SheetStream>,
    options: &StreamWriteOptions,
) -> XlsxResult<()> {
    if sheets.is_empty() {
        return Err(XlsxError::InvalidFormat("no sheets to write".into()));
    }

    let inline_strings = matches!(options.shared_strings, SharedStringsMode::Inline);
    let mut sst = StreamSst::new(&options.shared_strings)?;

    // === Phase 1: accumulate ===
    let mut spooled: Vec<SpooledSheet> = Vec::with_capacity(sheets.len());

    for sheet in sheets {
        let mut spool = BufWriter::new(tempfile::tempfile()?);
        let mut row_count = 0u64;
        let mut last_row: Option<u32> = None;
        let mut max_col = 0u16;
        let mut stats = ColumnStats::default();

        let sample_rows = match options.column_widths {
            ColumnWidthStrategy::AutoFitFromSample(n) => n as u64,
            _ => 0,
        };

        for row in sheet.rows {
            if let Some(last) = last_row {
                if row.row <= last {
                    return Err(XlsxError::RowOutOfOrder { row: row.row, last });
                }
            }
            last_row = Some(row.row);

            spool.write_all(&row.row.to_le_bytes())?;
            spool.write_all(&(row.cells.len() as u16).to_le_bytes())?;

            for (col, value) in &row.cells {
                if *col > max_col {
                    max_col = *col;
                }
                if row_count < sample_rows {
                    stats.observe(*col, value);
                }
                encode_cell(&mut spool, *col, value, inline_strings, &mut sst)?;
            }

            row_count += 1;
        }

        let mut file = spool
            .into_inner()
            .map_err(|e| XlsxError::Io(e.into_error()))?;
        file.seek(SeekFrom::Start(0))?;
        spooled.push(SpooledSheet {
            name: sheet.name,
            spool: file,
            row_count,
            last_row,
            max_col,
            stats,
            merged_ranges: sheet.merged_ranges,
        });
    }

    // === Phase 2: emit ===
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let temp = tempfile::NamedTempFile::new_in(dir)?;

    emit_package(temp.as_file(), &mut spooled, sst, options)?;

    temp.persist(path).map_err(|e| XlsxError::Io(e.error))?;
    Ok(())
}

fn encode_cell<W: Write>(
    out: &mut W,
    col: u16,
    value: &CellValue,
    inline_strings: bool,
    sst: &mut StreamSst,
) -> XlsxResult<()> {
    out.write_all(&col.to_le_bytes())?;

    match value {
        CellValue::Empty => {
            // Empty cells in RowData carry no information
            out.write_all(&[TAG_NUMBER])?;
            out.write_all(&0f64.to_le_bytes())?;
        }
        CellValue::Number(n) => {
            out.write_all(&[TAG_NUMBER])?;
            out.write_all(&n.to_le_bytes())?;
        }
        CellValue::Boolean(b) => {
            out.write_all(&[TAG_BOOL, *b as u8])?;
        }
        CellValue::DateTime(dt) => {
            out.write_all(&[TAG_DATETIME])?;
            out.write_all(&datetime_to_serial(*dt, false).to_le_bytes())?;
        }
        CellValue::Error(e) => {
            out.write_all(&[TAG_ERROR])?;
            write_bytes(out, e.as_str().as_bytes())?;
        }
        CellValue::Formula { text, .. } => {
            out.write_all(&[TAG_FORMULA])?;
            let body = text.strip_prefix('=').unwrap_or(text);
            write_bytes(out, body.as_bytes())?;
        }
        other => {
            // Text and rich text; rich runs flatten to plain text in the
            // streaming path
            let text = other
                .plain_text()
                .unwrap_or_else(|| other.to_string());
            if inline_strings {
                out.write_all(&[TAG_INLINE_STR])?;
                write_bytes(out, text.as_bytes())?;
            } else {
                let idx = sst.intern(&text)?;
                out.write_all(&[TAG_SST])?;
                out.write_all(&idx.to_le_bytes())?;
            }
        }
    }

    Ok(())
}

fn write_bytes<W: Write>(out: &mut W, bytes: &[u8]) -> XlsxResult<()> {
    out.write_all(&(bytes.len() as u32).to_le_bytes())?;
    out.write_all(bytes)?;
    Ok(())
}

fn read_bytes<R: Read>(input: &mut R) -> XlsxResult<String> {
    let mut len_buf = [0u8; 4];
    input.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut bytes = vec![0u8; len];
    input.read_exact(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn emit_package(
    file: &File,
    sheets: &mut [SpooledSheet],
    sst: StreamSst,
    options: &StreamWriteOptions,
) -> XlsxResult<()> {
    let mut zip = zip::ZipWriter::new(file);
    let entry = zip_entry_options(&options.package);

    let inline_strings = matches!(options.shared_strings, SharedStringsMode::Inline);
    let has_sst = !inline_strings && sst.count > 0;

    // [Content_Types].xml
    zip.start_file(part::CONTENT_TYPES, entry)?;
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
    );
    if has_sst {
        content_types.push_str(
            "\n  <Override PartName=\"/xl/sharedStrings.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml\"/>",
        );
    }
    for i in 0..sheets.len() {
        content_types.push_str(&format!(
            "\n  <Override PartName=\"/xl/worksheets/sheet{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
            i + 1
        ));
    }
    content_types.push_str("\n</Types>");
    zip.write_all(content_types.as_bytes())?;

    // _rels/.rels
    zip.start_file(part::ROOT_RELS, entry)?;
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#,
    )?;

    // xl/workbook.xml
    zip.start_file(part::WORKBOOK, entry)?;
    let mut workbook_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>"#,
    );
    for (i, sheet) in sheets.iter().enumerate() {
        workbook_xml.push_str(&format!(
            "\n    <sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            escape_xml_attr(&sheet.name),
            i + 1,
            i + 1
        ));
    }
    workbook_xml.push_str("\n  </sheets>\n</workbook>");
    zip.write_all(workbook_xml.as_bytes())?;

    // xl/_rels/workbook.xml.rels
    zip.start_file(part::WORKBOOK_RELS, entry)?;
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for i in 0..sheets.len() {
        rels.push_str(&format!(
            "\n  <Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{}.xml\"/>",
            i + 1,
            i + 1
        ));
    }
    let mut next = sheets.len() + 1;
    rels.push_str(&format!(
        "\n  <Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>",
        next
    ));
    next += 1;
    if has_sst {
        rels.push_str(&format!(
            "\n  <Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings\" Target=\"sharedStrings.xml\"/>",
            next
        ));
    }
    rels.push_str("\n</Relationships>");
    zip.write_all(rels.as_bytes())?;

    // xl/styles.xml: default + declared styles + a date style at the end
    zip.start_file(part::STYLES, entry)?;
    zip.write_all(streaming_styles_xml(&options.styles).as_bytes())?;

    // xl/sharedStrings.xml
    if has_sst {
        zip.start_file(part::SHARED_STRINGS, entry)?;
        let mut buffer = Vec::new();
        sst.emit(&mut buffer)?;
        zip.write_all(&buffer)?;
    } else {
        // SST ownership ends here either way; inline mode never built one
        drop(sst);
    }

    // Worksheets: stream each spool back out
    let date_xf = (options.styles.len() + 1) as u32;
    for (i, sheet) in sheets.iter_mut().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), entry)?;
        emit_worksheet(&mut zip, sheet, options, date_xf)?;
    }

    zip.finish()?;
    Ok(())
}

/// The streaming styles part: styles are fixed up front, so the table is
/// the default style, the declared styles in declared order (no dedup,
/// keeping ids positional), then one date style used for DateTime cells
fn streaming_styles_xml(styles: &[Style]) -> String {
    let mut list: Vec<Style> = Vec::with_capacity(styles.len() + 1);
    list.extend_from_slice(styles);
    list.push(Style::new().number_format(NumberFormat::DateTime));
    crate::styles::styles_xml_for_list(&list)
}

fn emit_worksheet<W: Write + Seek>(
    zip: &mut zip::ZipWriter<W>,
    sheet: &mut SpooledSheet,
    options: &StreamWriteOptions,
    date_xf: u32,
) -> XlsxResult<()> {
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    )?;

    // cols from the configured width strategy
    let mut cols = String::new();
    match &options.column_widths {
        ColumnWidthStrategy::None => {}
        ColumnWidthStrategy::Fixed(width) => {
            cols.push_str(&format!(
                "\n  <cols>\n    <col min=\"1\" max=\"{}\" width=\"{}\" customWidth=\"1\"/>\n  </cols>",
                sheet.max_col as u32 + 1,
                width
            ));
        }
        ColumnWidthStrategy::AutoFitFromSample(_) => {
            if !sheet.stats.max_chars.is_empty() {
                cols.push_str("\n  <cols>");
                for (&col, _) in &sheet.stats.max_chars {
                    if let Some(width) = sheet.stats.width_for(col) {
                        cols.push_str(&format!(
                            "\n    <col min=\"{}\" max=\"{}\" width=\"{}\" customWidth=\"1\"/>",
                            col as u32 + 1,
                            col as u32 + 1,
                            width
                        ));
                    }
                }
                cols.push_str("\n  </cols>");
            }
        }
    }
    zip.write_all(cols.as_bytes())?;

    zip.write_all(b"\n  <sheetData>")?;

    let mut reader = BufReader::new(&mut sheet.spool);
    for _ in 0..sheet.row_count {
        let mut row_buf = [0u8; 4];
        reader.read_exact(&mut row_buf)?;
        let row = u32::from_le_bytes(row_buf);

        let mut count_buf = [0u8; 2];
        reader.read_exact(&mut count_buf)?;
        let cell_count = u16::from_le_bytes(count_buf);

        let mut row_xml = format!("\n    <row r=\"{}\">", row + 1);

        for _ in 0..cell_count {
            let mut col_buf = [0u8; 2];
            reader.read_exact(&mut col_buf)?;
            let col = u16::from_le_bytes(col_buf);

            let mut tag = [0u8; 1];
            reader.read_exact(&mut tag)?;

            let cell_ref = CellAddress::new(row, col).to_a1_string();
            let style = options.column_styles.get(&col).copied();
            let style_attr = style
                .map(|s| format!(" s=\"{}\"", s))
                .unwrap_or_default();

            match tag[0] {
                TAG_NUMBER => {
                    let mut n = [0u8; 8];
                    reader.read_exact(&mut n)?;
                    row_xml.push_str(&format!(
                        "<c r=\"{}\"{}><v>{}</v></c>",
                        cell_ref,
                        style_attr,
                        f64::from_le_bytes(n)
                    ));
                }
                TAG_BOOL => {
                    let mut b = [0u8; 1];
                    reader.read_exact(&mut b)?;
                    row_xml.push_str(&format!(
                        "<c r=\"{}\"{} t=\"b\"><v>{}</v></c>",
                        cell_ref, style_attr, b[0]
                    ));
                }
                TAG_DATETIME => {
                    let mut n = [0u8; 8];
                    reader.read_exact(&mut n)?;
                    // DateTime cells use the trailing date style unless a
                    // column style was declared
                    let s = style.unwrap_or(date_xf);
                    row_xml.push_str(&format!(
                        "<c r=\"{}\" s=\"{}\"><v>{}</v></c>",
                        cell_ref,
                        s,
                        f64::from_le_bytes(n)
                    ));
                }
                TAG_INLINE_STR => {
                    let text = read_bytes(&mut reader)?;
                    row_xml.push_str(&format!(
                        "<c r=\"{}\"{} t=\"inlineStr\"><is><t>{}</t></is></c>",
                        cell_ref,
                        style_attr,
                        escape_xml(&text)
                    ));
                }
                TAG_SST => {
                    let mut idx = [0u8; 4];
                    reader.read_exact(&mut idx)?;
                    row_xml.push_str(&format!(
                        "<c r=\"{}\"{} t=\"s\"><v>{}</v></c>",
                        cell_ref,
                        style_attr,
                        u32::from_le_bytes(idx)
                    ));
                }
                TAG_ERROR => {
                    let text = read_bytes(&mut reader)?;
                    row_xml.push_str(&format!(
                        "<c r=\"{}\"{} t=\"e\"><v>{}</v></c>",
                        cell_ref,
                        style_attr,
                        escape_xml(&text)
                    ));
                }
                TAG_FORMULA => {
                    let text = read_bytes(&mut reader)?;
                    row_xml.push_str(&format!(
                        "<c r=\"{}\"{}><f>{}</f></c>",
                        cell_ref,
                        style_attr,
                        escape_xml(&text)
                    ));
                }
                other => {
                    return Err(XlsxError::InvalidFormat(format!(
                        "corrupt spool record tag {}",
                        other
                    )));
                }
            }
        }

        row_xml.push_str("</row>");
        zip.write_all(row_xml.as_bytes())?;
    }

    zip.write_all(b"\n  </sheetData>")?;

    if !sheet.merged_ranges.is_empty() {
        let mut merges = format!("\n  <mergeCells count=\"{}\">", sheet.merged_ranges.len());
        for range in &sheet.merged_ranges {
            merges.push_str(&format!("\n    <mergeCell ref=\"{}\"/>", range));
        }
        merges.push_str("\n  </mergeCells>");
        zip.write_all(merges.as_bytes())?;
    }

    zip.write_all(b"\n</worksheet>")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_must_ascend() {
        let rows = vec![RowData::new(5).set(0, 1.0), RowData::new(3).set(0, 2.0)];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let result = write_streaming(
            &path,
            vec![SheetStream::new("S", rows)],
            &StreamWriteOptions::default(),
        );
        assert!(matches!(
            result,
            Err(XlsxError::RowOutOfOrder { row: 3, last: 5 })
        ));
        assert!(!path.exists(), "failed write must not leave output behind");
    }

    #[test]
    fn test_width_estimator_clamps() {
        let mut stats = ColumnStats::default();
        stats.observe(0, &CellValue::text("ab"));
        stats.observe(1, &CellValue::text(&"x".repeat(500)));

        assert_eq!(stats.width_for(0), Some(8.43)); // floor
        assert_eq!(stats.width_for(1), Some(255.0)); // ceiling
        assert_eq!(stats.width_for(2), None);
    }

    #[test]
    fn test_sst_modes_assign_same_indices() {
        let dir = tempfile::tempdir().unwrap();

        let mut memory = StreamSst::new(&SharedStringsMode::InMemory).unwrap();
        let mut disk =
            StreamSst::new(&SharedStringsMode::OnDisk(dir.path().to_path_buf())).unwrap();

        for s in ["a", "b", "a", "c", "b"] {
            assert_eq!(memory.intern(s).unwrap(), disk.intern(s).unwrap());
        }

        let mut from_memory = Vec::new();
        memory.emit(&mut from_memory).unwrap();
        let mut from_disk = Vec::new();
        disk.emit(&mut from_disk).unwrap();
        assert_eq!(from_memory, from_disk);
    }
}
