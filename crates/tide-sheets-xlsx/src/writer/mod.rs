//! XLSX writer
//!
//! Produces a deterministic package: fixed entry order, fixed-epoch entry
//! timestamps, stable attribute order, and insertion-ordered shared-string
//! and style ids. Identical workbook values produce identical bytes.

use std::io::{Seek, Write};
use std::path::Path;

use ahash::AHashMap;

use crate::error::{XlsxError, XlsxResult};
use crate::package::{self, escape_xml, escape_xml_attr, part, zip_entry_options, WriteOptions};
use crate::styles::StyleTable;
use tide_sheets_core::serial::datetime_to_serial;
use tide_sheets_core::{
    CellAddress, CellValue, ColumnProperties, FontStyle, RichTextRun, Workbook, Worksheet,
};

/// Shared-strings table builder: indices in first-sight order
#[derive(Debug, Default)]
pub(crate) struct SstBuilder {
    /// Serialized `<si>` bodies in insertion order
    entries: Vec<String>,
    /// Entry body -> index
    index: AHashMap<String, u32>,
    /// Total number of string cells referencing the table
    total_refs: u64,
}

impl SstBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn intern_text(&mut self, text: &str) -> u32 {
        self.intern_body(si_plain(text))
    }

    pub(crate) fn intern_rich(&mut self, runs: &[RichTextRun]) -> u32 {
        self.intern_body(si_rich(runs))
    }

    fn intern_body(&mut self, body: String) -> u32 {
        self.total_refs += 1;
        if let Some(&idx) = self.index.get(&body) {
            return idx;
        }
        let idx = self.entries.len() as u32;
        self.entries.push(body.clone());
        self.index.insert(body, idx);
        idx
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn to_xml(&self) -> String {
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<sst xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" count=\"{}\" uniqueCount=\"{}\">",
            self.total_refs,
            self.entries.len()
        );
        for entry in &self.entries {
            xml.push_str("\n  ");
            xml.push_str(entry);
        }
        xml.push_str("\n</sst>");
        xml
    }
}

fn text_element(text: &str) -> String {
    let encoded = package::encode_excel_escapes(text);
    let space = if encoded.starts_with(char::is_whitespace)
        || encoded.ends_with(char::is_whitespace)
    {
        " xml:space=\"preserve\""
    } else {
        ""
    };
    format!("<t{}>{}</t>", space, escape_xml(&encoded))
}

fn si_plain(text: &str) -> String {
    format!("<si>{}</si>", text_element(text))
}

fn si_rich(runs: &[RichTextRun]) -> String {
    let mut out = String::from("<si>");
    for run in runs {
        out.push_str("<r>");
        if let Some(font) = &run.font {
            out.push_str(&run_properties(font));
        }
        out.push_str(&text_element(&run.text));
        out.push_str("</r>");
    }
    out.push_str("</si>");
    out
}

fn run_properties(font: &FontStyle) -> String {
    let mut out = String::from("<rPr>");
    if font.bold {
        out.push_str("<b/>");
    }
    if font.italic {
        out.push_str("<i/>");
    }
    if font.underline {
        out.push_str("<u/>");
    }
    out.push_str(&format!("<sz val=\"{}\"/>", font.size));
    if let Some(hex) = font.color.to_argb_hex() {
        out.push_str(&format!("<color rgb=\"{}\"/>", hex));
    }
    out.push_str(&format!(
        "<rFont val=\"{}\"/>",
        escape_xml_attr(&font.name)
    ));
    out.push_str("</rPr>");
    out
}

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a path.
    ///
    /// Output goes to a sibling temporary file first and is renamed into
    /// place on success, so a failed write never leaves a truncated file.
    pub fn write_file<P: AsRef<Path>>(
        workbook: &Workbook,
        path: P,
        options: &WriteOptions,
    ) -> XlsxResult<()> {
        let path = path.as_ref();
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let temp = tempfile::NamedTempFile::new_in(dir)?;

        Self::write(workbook, temp.as_file(), options)?;

        temp.persist(path)
            .map_err(|e| XlsxError::Io(e.error))?;
        Ok(())
    }

    /// Write a workbook to a writer
    pub fn write<W: Write + Seek>(
        workbook: &Workbook,
        writer: W,
        options: &WriteOptions,
    ) -> XlsxResult<()> {
        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat(
                "workbook has no worksheets".into(),
            ));
        }

        let mut zip = zip::ZipWriter::new(writer);
        let entry = zip_entry_options(options);

        let style_table = StyleTable::build(workbook);

        // Pre-intern every string cell so the SST part can be emitted
        // before the worksheets while keeping first-sight index order
        let mut sst = SstBuilder::new();
        for sheet in workbook.sheets() {
            for (_row, _col, cell) in sheet.iter_cells() {
                match &cell.value {
                    CellValue::Text(s) => {
                        sst.intern_text(s.as_str());
                    }
                    CellValue::RichText(runs) => {
                        sst.intern_rich(runs);
                    }
                    _ => {}
                }
            }
        }

        let sheets_with_comments: Vec<usize> = workbook
            .sheets()
            .enumerate()
            .filter(|(_, sheet)| sheet.comment_count() > 0)
            .map(|(i, _)| i)
            .collect();

        zip.start_file(part::CONTENT_TYPES, entry)?;
        zip.write_all(Self::content_types_xml(workbook, &sst, &sheets_with_comments).as_bytes())?;

        zip.start_file(part::ROOT_RELS, entry)?;
        zip.write_all(ROOT_RELS_XML.as_bytes())?;

        zip.start_file(part::CORE_PROPS, entry)?;
        zip.write_all(Self::core_props_xml(workbook).as_bytes())?;

        zip.start_file(part::APP_PROPS, entry)?;
        zip.write_all(Self::app_props_xml(workbook).as_bytes())?;

        zip.start_file(part::WORKBOOK, entry)?;
        zip.write_all(Self::workbook_xml(workbook).as_bytes())?;

        zip.start_file(part::WORKBOOK_RELS, entry)?;
        zip.write_all(Self::workbook_rels_xml(workbook, &sst).as_bytes())?;

        zip.start_file(part::STYLES, entry)?;
        zip.write_all(style_table.to_xml().as_bytes())?;

        if !sst.is_empty() {
            zip.start_file(part::SHARED_STRINGS, entry)?;
            zip.write_all(sst.to_xml().as_bytes())?;
        }

        let mut sst_replay = SstBuilder::new();
        for (index, sheet) in workbook.sheets().enumerate() {
            let external_links: Vec<((u32, u16), String)> = sheet
                .hyperlinks()
                .filter(|(_, link)| !link.is_internal())
                .map(|(pos, link)| (pos, link.target.clone()))
                .collect();

            zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), entry)?;
            zip.write_all(
                Self::worksheet_xml(
                    workbook,
                    sheet,
                    index,
                    &style_table,
                    &mut sst_replay,
                    &external_links,
                )
                .as_bytes(),
            )?;

            let has_comments = sheet.comment_count() > 0;
            if has_comments || !external_links.is_empty() {
                zip.start_file(
                    format!("xl/worksheets/_rels/sheet{}.xml.rels", index + 1),
                    entry,
                )?;
                zip.write_all(
                    Self::sheet_rels_xml(index, has_comments, &external_links).as_bytes(),
                )?;
            }

            if has_comments {
                zip.start_file(format!("xl/comments{}.xml", index + 1), entry)?;
                zip.write_all(Self::comments_xml(sheet).as_bytes())?;
            }
        }

        // Preserved parts last, in name order
        let mut preserved: Vec<_> = workbook.preserved_parts().iter().collect();
        preserved.sort_by(|a, b| a.name.cmp(&b.name));
        for part in preserved {
            zip.start_file(part.name.as_str(), entry)?;
            zip.write_all(&part.data)?;
        }

        zip.finish()?;
        Ok(())
    }

    fn content_types_xml(
        workbook: &Workbook,
        sst: &SstBuilder,
        sheets_with_comments: &[usize],
    ) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
  <Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#,
        );

        if !sst.is_empty() {
            xml.push_str(
                "\n  <Override PartName=\"/xl/sharedStrings.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml\"/>",
            );
        }

        for i in 0..workbook.sheet_count() {
            xml.push_str(&format!(
                "\n  <Override PartName=\"/xl/worksheets/sheet{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
                i + 1
            ));
        }

        for &i in sheets_with_comments {
            xml.push_str(&format!(
                "\n  <Override PartName=\"/xl/comments{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml\"/>",
                i + 1
            ));
        }

        let mut preserved: Vec<_> = workbook
            .preserved_parts()
            .iter()
            .filter_map(|p| p.content_type.as_ref().map(|t| (&p.name, t)))
            .collect();
        preserved.sort();
        for (name, content_type) in preserved {
            xml.push_str(&format!(
                "\n  <Override PartName=\"/{}\" ContentType=\"{}\"/>",
                escape_xml_attr(name),
                escape_xml_attr(content_type)
            ));
        }

        xml.push_str("\n</Types>");
        xml
    }

    fn core_props_xml(workbook: &Workbook) -> String {
        let props = workbook.properties();
        // Fixed defaults keep identical workbook values byte-identical
        let created = props.created.as_deref().unwrap_or("2000-01-01T00:00:00Z");
        let modified = props.modified.as_deref().unwrap_or(created);

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
        );

        if let Some(title) = &props.title {
            xml.push_str(&format!("\n  <dc:title>{}</dc:title>", escape_xml(title)));
        }
        if let Some(subject) = &props.subject {
            xml.push_str(&format!(
                "\n  <dc:subject>{}</dc:subject>",
                escape_xml(subject)
            ));
        }
        xml.push_str(&format!(
            "\n  <dc:creator>{}</dc:creator>",
            escape_xml(props.author.as_deref().unwrap_or(""))
        ));
        xml.push_str(&format!(
            "\n  <dcterms:created xsi:type=\"dcterms:W3CDTF\">{}</dcterms:created>",
            escape_xml(created)
        ));
        xml.push_str(&format!(
            "\n  <dcterms:modified xsi:type=\"dcterms:W3CDTF\">{}</dcterms:modified>",
            escape_xml(modified)
        ));
        xml.push_str("\n</cp:coreProperties>");
        xml
    }

    fn app_props_xml(workbook: &Workbook) -> String {
        let company = workbook
            .properties()
            .company
            .as_deref()
            .unwrap_or("");
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
  <Application>tide-sheets</Application>
  <Company>{}</Company>
</Properties>"#,
            escape_xml(company)
        )
    }

    fn workbook_xml(workbook: &Workbook) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );

        if workbook.settings().date_1904 {
            xml.push_str("\n  <workbookPr date1904=\"1\"/>");
        }

        xml.push_str(&format!(
            "\n  <bookViews>\n    <workbookView activeTab=\"{}\"/>\n  </bookViews>\n  <sheets>",
            workbook.active_sheet()
        ));

        for (i, sheet) in workbook.sheets().enumerate() {
            xml.push_str(&format!(
                "\n    <sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
                escape_xml_attr(sheet.name()),
                i + 1,
                i + 1
            ));
        }

        xml.push_str("\n  </sheets>\n</workbook>");
        xml
    }

    fn workbook_rels_xml(workbook: &Workbook, sst: &SstBuilder) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for i in 0..workbook.sheet_count() {
            xml.push_str(&format!(
                "\n  <Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{}.xml\"/>",
                i + 1,
                i + 1
            ));
        }

        let mut next = workbook.sheet_count() + 1;
        xml.push_str(&format!(
            "\n  <Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>",
            next
        ));
        next += 1;

        if !sst.is_empty() {
            xml.push_str(&format!(
                "\n  <Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings\" Target=\"sharedStrings.xml\"/>",
                next
            ));
            next += 1;
        }

        // A preserved theme keeps its workbook relationship
        if workbook
            .preserved_parts()
            .iter()
            .any(|p| p.name == "xl/theme/theme1.xml")
        {
            xml.push_str(&format!(
                "\n  <Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme\" Target=\"theme/theme1.xml\"/>",
                next
            ));
        }

        xml.push_str("\n</Relationships>");
        xml
    }

    fn worksheet_xml(
        workbook: &Workbook,
        sheet: &Worksheet,
        index: usize,
        style_table: &StyleTable,
        sst: &mut SstBuilder,
        external_links: &[((u32, u16), String)],
    ) -> String {
        let date_1904 = workbook.settings().date_1904;

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );

        // dimension
        let dimension = sheet
            .used_range()
            .map(|r| r.to_a1_string())
            .unwrap_or_else(|| "A1".to_string());
        xml.push_str(&format!("\n  <dimension ref=\"{}\"/>", dimension));

        // sheetViews (selected tab, freeze panes)
        let selected = if index == workbook.active_sheet() {
            " tabSelected=\"1\""
        } else {
            ""
        };
        match sheet.freeze_panes() {
            Some(freeze) => {
                let top_left = CellAddress::new(freeze.row, freeze.col).to_a1_string();
                xml.push_str(&format!(
                    "\n  <sheetViews>\n    <sheetView{} workbookViewId=\"0\">\n      <pane xSplit=\"{}\" ySplit=\"{}\" topLeftCell=\"{}\" activePane=\"bottomRight\" state=\"frozen\"/>\n    </sheetView>\n  </sheetViews>",
                    selected, freeze.col, freeze.row, top_left
                ));
            }
            None => {
                xml.push_str(&format!(
                    "\n  <sheetViews>\n    <sheetView{} workbookViewId=\"0\"/>\n  </sheetViews>",
                    selected
                ));
            }
        }

        // sheetFormatPr
        if sheet.default_column_width().is_some() || sheet.default_row_height().is_some() {
            let mut pr = String::from("\n  <sheetFormatPr");
            if let Some(w) = sheet.default_column_width() {
                pr.push_str(&format!(" defaultColWidth=\"{}\"", w));
            }
            pr.push_str(&format!(
                " defaultRowHeight=\"{}\"",
                sheet.default_row_height().unwrap_or(15.0)
            ));
            pr.push_str("/>");
            xml.push_str(&pr);
        }

        // cols: group runs of identical properties
        xml.push_str(&Self::cols_xml(sheet));

        // sheetData: rows with content, plus rows that only carry
        // properties (a hidden empty row still needs its element)
        let mut rows: std::collections::BTreeMap<u32, Vec<(u16, &tide_sheets_core::CellData)>> =
            std::collections::BTreeMap::new();
        for (row, col, cell) in sheet.iter_cells() {
            rows.entry(row).or_default().push((col, cell));
        }
        for &row in sheet.row_properties().keys() {
            rows.entry(row).or_default();
        }

        xml.push_str("\n  <sheetData>");
        for (row, cells) in rows {
            let props = sheet.row_properties().get(&row);
            let mut row_el = format!("\n    <row r=\"{}\"", row + 1);
            if let Some(height) = props.and_then(|p| p.height) {
                row_el.push_str(&format!(" ht=\"{}\" customHeight=\"1\"", height));
            }
            if props.map(|p| p.hidden).unwrap_or(false) {
                row_el.push_str(" hidden=\"1\"");
            }

            if cells.is_empty() {
                row_el.push_str("/>");
                xml.push_str(&row_el);
                continue;
            }

            row_el.push('>');
            xml.push_str(&row_el);
            for (col, cell) in cells {
                xml.push_str(&Self::cell_xml(
                    index, row, col, cell, style_table, sst, date_1904,
                ));
            }
            xml.push_str("\n    </row>");
        }
        xml.push_str("\n  </sheetData>");

        // mergeCells
        let merged = sheet.merged_regions();
        if !merged.is_empty() {
            let mut sorted: Vec<_> = merged.to_vec();
            sorted.sort_by_key(|r| (r.start.row, r.start.col));
            xml.push_str(&format!("\n  <mergeCells count=\"{}\">", sorted.len()));
            for range in sorted {
                xml.push_str(&format!("\n    <mergeCell ref=\"{}\"/>", range));
            }
            xml.push_str("\n  </mergeCells>");
        }

        // hyperlinks (internal use location; external use sheet rels)
        let links: Vec<_> = sheet.hyperlinks().collect();
        if !links.is_empty() {
            let rid_base = if sheet.comment_count() > 0 { 2 } else { 1 };
            let mut external_index = 0usize;
            xml.push_str("\n  <hyperlinks>");
            for ((row, col), link) in links {
                let cell_ref = CellAddress::new(row, col).to_a1_string();
                let tooltip = link
                    .tooltip
                    .as_ref()
                    .map(|t| format!(" tooltip=\"{}\"", escape_xml_attr(t)))
                    .unwrap_or_default();
                if link.is_internal() {
                    xml.push_str(&format!(
                        "\n    <hyperlink ref=\"{}\" location=\"{}\"{}/>",
                        cell_ref,
                        escape_xml_attr(&link.target),
                        tooltip
                    ));
                } else {
                    xml.push_str(&format!(
                        "\n    <hyperlink ref=\"{}\" r:id=\"rId{}\"{}/>",
                        cell_ref,
                        rid_base + external_index,
                        tooltip
                    ));
                    external_index += 1;
                }
            }
            xml.push_str("\n  </hyperlinks>");
        }
        debug_assert_eq!(
            external_links.len(),
            sheet.hyperlinks().filter(|(_, l)| !l.is_internal()).count()
        );

        xml.push_str("\n</worksheet>");
        xml
    }

    fn cols_xml(sheet: &Worksheet) -> String {
        let props = sheet.column_properties();
        if props.is_empty() {
            return String::new();
        }

        // Group consecutive columns with identical properties
        let mut groups: Vec<(u16, u16, ColumnProperties)> = Vec::new();
        for (&col, &prop) in props {
            match groups.last_mut() {
                Some((_, end, last)) if *end + 1 == col && *last == prop => *end = col,
                _ => groups.push((col, col, prop)),
            }
        }

        let mut xml = String::from("\n  <cols>");
        for (start, end, prop) in groups {
            let mut col = format!("\n    <col min=\"{}\" max=\"{}\"", start + 1, end + 1);
            match prop.width {
                Some(width) => col.push_str(&format!(" width=\"{}\" customWidth=\"1\"", width)),
                None => col.push_str(&format!(" width=\"{}\"", 8.43)),
            }
            if prop.hidden {
                col.push_str(" hidden=\"1\"");
            }
            col.push_str("/>");
            xml.push_str(&col);
        }
        xml.push_str("\n  </cols>");
        xml
    }

    #[allow(clippy::too_many_arguments)]
    fn cell_xml(
        sheet_index: usize,
        row: u32,
        col: u16,
        cell: &tide_sheets_core::CellData,
        style_table: &StyleTable,
        sst: &mut SstBuilder,
        date_1904: bool,
    ) -> String {
        let cell_ref = CellAddress::new(row, col).to_a1_string();

        let xf = match &cell.value {
            CellValue::DateTime(_) => style_table.xf_for_datetime(sheet_index, cell.style_index),
            _ => style_table.xf_for(sheet_index, cell.style_index),
        };
        let style_attr = if xf != 0 {
            format!(" s=\"{}\"", xf)
        } else {
            String::new()
        };

        match &cell.value {
            CellValue::Number(n) => format!(
                "\n      <c r=\"{}\"{}><v>{}</v></c>",
                cell_ref, style_attr, n
            ),
            CellValue::DateTime(dt) => format!(
                "\n      <c r=\"{}\"{}><v>{}</v></c>",
                cell_ref,
                style_attr,
                datetime_to_serial(*dt, date_1904)
            ),
            CellValue::Text(s) => {
                let idx = sst.intern_text(s.as_str());
                format!(
                    "\n      <c r=\"{}\"{} t=\"s\"><v>{}</v></c>",
                    cell_ref, style_attr, idx
                )
            }
            CellValue::RichText(runs) => {
                let idx = sst.intern_rich(runs);
                format!(
                    "\n      <c r=\"{}\"{} t=\"s\"><v>{}</v></c>",
                    cell_ref, style_attr, idx
                )
            }
            CellValue::Boolean(b) => format!(
                "\n      <c r=\"{}\"{} t=\"b\"><v>{}</v></c>",
                cell_ref,
                style_attr,
                if *b { 1 } else { 0 }
            ),
            CellValue::Error(e) => format!(
                "\n      <c r=\"{}\"{} t=\"e\"><v>{}</v></c>",
                cell_ref,
                style_attr,
                escape_xml(e.as_str())
            ),
            CellValue::Formula { text, cached_value } => {
                let body = text.strip_prefix('=').unwrap_or(text);
                let formula = format!("<f>{}</f>", escape_xml(body));
                match cached_value.as_deref() {
                    Some(CellValue::Number(n)) => format!(
                        "\n      <c r=\"{}\"{}>{}<v>{}</v></c>",
                        cell_ref, style_attr, formula, n
                    ),
                    Some(CellValue::Boolean(b)) => format!(
                        "\n      <c r=\"{}\"{} t=\"b\">{}<v>{}</v></c>",
                        cell_ref,
                        style_attr,
                        formula,
                        if *b { 1 } else { 0 }
                    ),
                    Some(CellValue::Error(e)) => format!(
                        "\n      <c r=\"{}\"{} t=\"e\">{}<v>{}</v></c>",
                        cell_ref,
                        style_attr,
                        formula,
                        escape_xml(e.as_str())
                    ),
                    Some(CellValue::DateTime(dt)) => format!(
                        "\n      <c r=\"{}\"{}>{}<v>{}</v></c>",
                        cell_ref,
                        style_attr,
                        formula,
                        datetime_to_serial(*dt, date_1904)
                    ),
                    Some(other) => match other.plain_text().or_else(|| other.as_str().map(String::from)) {
                        Some(text) => format!(
                            "\n      <c r=\"{}\"{} t=\"str\">{}<v>{}</v></c>",
                            cell_ref,
                            style_attr,
                            formula,
                            escape_xml(&text)
                        ),
                        None => format!(
                            "\n      <c r=\"{}\"{}>{}</c>",
                            cell_ref, style_attr, formula
                        ),
                    },
                    None => format!(
                        "\n      <c r=\"{}\"{}>{}</c>",
                        cell_ref, style_attr, formula
                    ),
                }
            }
            CellValue::Empty => {
                // Style-only cells round-trip their formatting
                if xf != 0 {
                    format!("\n      <c r=\"{}\"{}/>", cell_ref, style_attr)
                } else {
                    String::new()
                }
            }
        }
    }

    fn sheet_rels_xml(
        sheet_index: usize,
        has_comments: bool,
        external_links: &[((u32, u16), String)],
    ) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        let mut next = 1;
        if has_comments {
            xml.push_str(&format!(
                "\n  <Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments\" Target=\"../comments{}.xml\"/>",
                next,
                sheet_index + 1
            ));
            next += 1;
        }

        for (_, target) in external_links {
            xml.push_str(&format!(
                "\n  <Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink\" Target=\"{}\" TargetMode=\"External\"/>",
                next,
                escape_xml_attr(target)
            ));
            next += 1;
        }

        xml.push_str("\n</Relationships>");
        xml
    }

    fn comments_xml(sheet: &Worksheet) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <authors>"#,
        );

        let authors = sheet.comment_authors();
        for author in &authors {
            xml.push_str(&format!("\n    <author>{}</author>", escape_xml(author)));
        }
        if authors.is_empty() {
            xml.push_str("\n    <author></author>");
        }

        xml.push_str("\n  </authors>\n  <commentList>");

        let author_index: AHashMap<&str, usize> = authors
            .iter()
            .enumerate()
            .map(|(i, a)| (*a, i))
            .collect();

        for ((row, col), comment) in sheet.comments() {
            let cell_ref = CellAddress::new(row, col).to_a1_string();
            let author_id = author_index
                .get(comment.author.as_str())
                .copied()
                .unwrap_or(0);

            xml.push_str(&format!(
                "\n    <comment ref=\"{}\" authorId=\"{}\">\n      <text>\n        <r>\n          {}\n        </r>\n      </text>\n    </comment>",
                cell_ref,
                author_id,
                text_element(&comment.text)
            ));
        }

        xml.push_str("\n  </commentList>\n</comments>");
        xml
    }
}

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_sst_builder_dedups_in_order() {
        let mut sst = SstBuilder::new();
        assert_eq!(sst.intern_text("a"), 0);
        assert_eq!(sst.intern_text("b"), 1);
        assert_eq!(sst.intern_text("a"), 0);
        assert_eq!(sst.entries.len(), 2);
        assert_eq!(sst.total_refs, 3);

        let xml = sst.to_xml();
        assert!(xml.contains("count=\"3\" uniqueCount=\"2\""));
        // Insertion order preserved
        assert!(xml.find("<t>a</t>").unwrap() < xml.find("<t>b</t>").unwrap());
    }

    #[test]
    fn test_sst_preserves_whitespace() {
        let mut sst = SstBuilder::new();
        sst.intern_text("  padded ");
        assert!(sst.to_xml().contains("xml:space=\"preserve\""));
    }

    #[test]
    fn test_deterministic_output() {
        let build = || {
            let mut wb = Workbook::new();
            let sheet = wb.sheet_mut(0).unwrap();
            sheet.set_value("A1", "hello").unwrap();
            sheet.set_value("B2", 42.0).unwrap();
            sheet.set_formula("C3", "=B2*2").unwrap();
            sheet
                .merge_cells(&tide_sheets_core::CellRange::parse("D1:E1").unwrap())
                .unwrap();
            wb
        };

        let mut first = Vec::new();
        XlsxWriter::write(&build(), Cursor::new(&mut first), &WriteOptions::default()).unwrap();

        let mut second = Vec::new();
        XlsxWriter::write(&build(), Cursor::new(&mut second), &WriteOptions::default()).unwrap();

        assert_eq!(first, second, "identical workbooks must produce identical bytes");
    }

    #[test]
    fn test_debug_mode_differs_but_both_parse() {
        let mut wb = Workbook::new();
        wb.sheet_mut(0).unwrap().set_value("A1", "x").unwrap();

        let mut compact = Vec::new();
        XlsxWriter::write(&wb, Cursor::new(&mut compact), &WriteOptions::default()).unwrap();

        let mut debug = Vec::new();
        let options = WriteOptions {
            debug: true,
            ..Default::default()
        };
        XlsxWriter::write(&wb, Cursor::new(&mut debug), &options).unwrap();

        // STORED entries make the archive larger
        assert!(debug.len() > compact.len());
    }

    #[test]
    fn test_empty_workbook_rejected() {
        let wb = Workbook::empty();
        let mut buf = Vec::new();
        assert!(XlsxWriter::write(&wb, Cursor::new(&mut buf), &WriteOptions::default()).is_err());
    }
}
