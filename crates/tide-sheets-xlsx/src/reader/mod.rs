//! XLSX reader
//!
//! Decodes the package through relationships: worksheet parts come from
//! `xl/_rels/workbook.xml.rels`, never from filename conventions. Parts the
//! model does not understand are preserved verbatim for round-trip.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use ahash::AHashMap;
use log::warn;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::package::{
    check_archive_limits, decode_excel_escapes, part, xml_parse_error, ReadOptions,
};
use crate::styles::{read_styles_xml, ParsedStyles};
use tide_sheets_core::serial::serial_to_datetime;
use tide_sheets_core::{
    CellAddress, CellComment, CellError, CellRange, CellValue, Hyperlink, PreservedPart,
    RichTextRun, StringPool, Workbook, Worksheet,
};

/// Content-type declarations from `[Content_Types].xml`
#[derive(Debug, Default)]
struct ContentTypes {
    overrides: HashMap<String, String>,
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path with default limits
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        Self::read_file_with_options(path, &ReadOptions::default())
    }

    /// Read a workbook from a file path
    pub fn read_file_with_options<P: AsRef<Path>>(
        path: P,
        options: &ReadOptions,
    ) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(file, options)
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R, options: &ReadOptions) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        check_archive_limits(&mut archive, options)?;

        if archive.by_name(part::CONTENT_TYPES).is_err() {
            return Err(XlsxError::MissingContentTypes);
        }
        if archive.by_name(part::WORKBOOK).is_err() {
            return Err(XlsxError::MissingWorkbookPart);
        }

        let content_types = Self::read_content_types(&mut archive)?;
        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let parsed_styles = Self::read_styles(&mut archive)?;
        let (sheet_info, date_1904, active_tab) = Self::read_workbook_info(&mut archive)?;
        let sheet_targets = Self::read_worksheet_targets(&mut archive)?;

        let mut workbook = Workbook::empty();
        workbook.settings_mut().date_1904 = date_1904;

        let mut consumed: Vec<String> = vec![
            part::CONTENT_TYPES.into(),
            part::ROOT_RELS.into(),
            part::WORKBOOK.into(),
            part::WORKBOOK_RELS.into(),
            part::STYLES.into(),
            part::SHARED_STRINGS.into(),
            part::CORE_PROPS.into(),
            part::APP_PROPS.into(),
        ];

        for (name, r_id) in &sheet_info {
            let path = match sheet_targets.get(r_id) {
                Some(path) => path.clone(),
                None => {
                    warn!("sheet '{}' has no worksheet relationship; skipping", name);
                    continue;
                }
            };

            let sheet_idx = workbook.add_sheet_named(name)?;
            let rels_path = sheet_rels_path(&path);
            let (link_targets, comments_path) =
                Self::read_sheet_rels(&mut archive, &rels_path, &path)?;

            {
                let sheet = workbook.sheet_mut(sheet_idx).unwrap();
                Self::read_worksheet(
                    &mut archive,
                    &path,
                    sheet,
                    &shared_strings,
                    &parsed_styles,
                    &link_targets,
                    date_1904,
                )?;

                if let Some(comments_path) = &comments_path {
                    Self::read_comments(&mut archive, comments_path, sheet)?;
                }
            }

            consumed.push(path);
            consumed.push(rels_path);
            if let Some(comments_path) = comments_path {
                consumed.push(comments_path);
            }
        }

        if workbook.is_empty() {
            workbook.add_sheet()?;
        }

        if active_tab < workbook.sheet_count() {
            workbook.activate(active_tab)?;
        }

        Self::read_core_props(&mut archive, &mut workbook)?;

        // Preserve everything the model does not understand
        let names: Vec<String> = archive.file_names().map(String::from).collect();
        for name in names {
            if name.ends_with('/') || consumed.iter().any(|c| c == &name) {
                continue;
            }
            let mut data = Vec::new();
            archive.by_name(&name)?.read_to_end(&mut data)?;
            workbook.add_preserved_part(PreservedPart {
                content_type: content_types.overrides.get(&name).cloned(),
                name,
                data,
            });
        }

        Ok(workbook)
    }

    fn read_content_types<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<ContentTypes> {
        let file = archive
            .by_name(part::CONTENT_TYPES)
            .map_err(|_| XlsxError::MissingContentTypes)?;

        let mut xml = Reader::from_reader(BufReader::new(file));
        xml.trim_text(true);

        let mut types = ContentTypes::default();
        let mut buf = Vec::new();

        loop {
            match read_event(&mut xml, &mut buf, part::CONTENT_TYPES)? {
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"Override" => {
                    let name = attr(&e, b"PartName");
                    let content_type = attr(&e, b"ContentType");
                    if let (Some(name), Some(content_type)) = (name, content_type) {
                        types
                            .overrides
                            .insert(name.trim_start_matches('/').to_string(), content_type);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(types)
    }

    /// Read the shared strings table, including rich-text entries
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<CellValue>> {
        let mut strings = Vec::new();

        let file = match archive.by_name(part::SHARED_STRINGS) {
            Ok(f) => f,
            Err(_) => return Ok(strings), // absent SST is valid
        };

        let mut xml = Reader::from_reader(BufReader::new(file));
        xml.trim_text(false);

        let mut buf = Vec::new();
        let mut pool = StringPool::new();

        let mut in_si = false;
        let mut in_t = false;
        let mut in_rpr = false;
        let mut current_text = String::new();
        let mut runs: Vec<RichTextRun> = Vec::new();
        let mut run_text = String::new();
        let mut run_font: Option<tide_sheets_core::FontStyle> = None;
        let mut in_run = false;

        loop {
            match read_event(&mut xml, &mut buf, part::SHARED_STRINGS)? {
                Event::Start(e) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current_text.clear();
                        runs.clear();
                    }
                    b"r" if in_si => {
                        in_run = true;
                        run_text.clear();
                        run_font = None;
                    }
                    b"rPr" if in_run => {
                        in_rpr = true;
                        run_font = Some(tide_sheets_core::FontStyle::default());
                    }
                    b"t" if in_si => in_t = true,
                    _ => {}
                },
                Event::Empty(e) if in_rpr => {
                    if let Some(font) = run_font.as_mut() {
                        apply_run_property(&e, font);
                    }
                }
                Event::Text(e) if in_t => {
                    if let Ok(text) = e.unescape() {
                        if in_run {
                            run_text.push_str(&text);
                        } else {
                            current_text.push_str(&text);
                        }
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    b"si" => {
                        if runs.is_empty() {
                            let decoded = decode_excel_escapes(&current_text);
                            strings.push(CellValue::Text(pool.intern(decoded)));
                        } else {
                            strings.push(CellValue::RichText(std::mem::take(&mut runs)));
                        }
                        in_si = false;
                    }
                    b"r" if in_run => {
                        runs.push(RichTextRun {
                            font: run_font.take(),
                            text: decode_excel_escapes(&run_text),
                        });
                        in_run = false;
                    }
                    b"rPr" => in_rpr = false,
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

    fn read_styles<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> XlsxResult<ParsedStyles> {
        match archive.by_name(part::STYLES) {
            Ok(file) => read_styles_xml(BufReader::new(file), part::STYLES),
            Err(_) => Ok(ParsedStyles::default()),
        }
    }

    /// Read workbook.xml: sheet (name, rId) pairs, the date system, and
    /// the active tab
    pub(crate) fn read_workbook_info<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<(Vec<(String, String)>, bool, usize)> {
        let file = archive
            .by_name(part::WORKBOOK)
            .map_err(|_| XlsxError::MissingWorkbookPart)?;

        let mut xml = Reader::from_reader(BufReader::new(file));
        xml.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();
        let mut date_1904 = false;
        let mut active_tab = 0usize;

        loop {
            match read_event(&mut xml, &mut buf, part::WORKBOOK)? {
                Event::Empty(e) | Event::Start(e) => match e.name().as_ref() {
                    b"sheet" => {
                        let name = attr(&e, b"name");
                        let r_id = attr(&e, b"r:id");
                        if let (Some(name), Some(r_id)) = (name, r_id) {
                            sheets.push((name, r_id));
                        }
                    }
                    b"workbookPr" => {
                        if let Some(v) = attr(&e, b"date1904") {
                            date_1904 = v == "1" || v == "true";
                        }
                    }
                    b"workbookView" => {
                        if let Some(v) = attr(&e, b"activeTab") {
                            active_tab = v.parse().unwrap_or(0);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok((sheets, date_1904, active_tab))
    }

    /// Read workbook.xml.rels: rId -> worksheet part path
    pub(crate) fn read_worksheet_targets<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<HashMap<String, String>> {
        let file = archive
            .by_name(part::WORKBOOK_RELS)
            .map_err(|_| XlsxError::MissingPart(part::WORKBOOK_RELS.into()))?;

        let mut xml = Reader::from_reader(BufReader::new(file));
        xml.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match read_event(&mut xml, &mut buf, part::WORKBOOK_RELS)? {
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"Relationship" => {
                    let id = attr(&e, b"Id");
                    let target = attr(&e, b"Target");
                    let rel_type = attr(&e, b"Type");

                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            rels.insert(id, resolve_target("xl", &target));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Read a worksheet's own rels: hyperlink targets and the comments
    /// part path
    fn read_sheet_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        rels_path: &str,
        sheet_path: &str,
    ) -> XlsxResult<(AHashMap<String, String>, Option<String>)> {
        let file = match archive.by_name(rels_path) {
            Ok(f) => f,
            Err(_) => return Ok((AHashMap::new(), None)),
        };

        let base = parent_dir(sheet_path);
        let mut xml = Reader::from_reader(BufReader::new(file));
        xml.trim_text(true);

        let mut buf = Vec::new();
        let mut links = AHashMap::new();
        let mut comments = None;

        loop {
            match read_event(&mut xml, &mut buf, rels_path)? {
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"Relationship" => {
                    let id = attr(&e, b"Id");
                    let target = attr(&e, b"Target");
                    let rel_type = attr(&e, b"Type");

                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/hyperlink") {
                            links.insert(id, target);
                        } else if rel_type.ends_with("/comments") {
                            comments = Some(resolve_target(&base, &target));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok((links, comments))
    }

    #[allow(clippy::too_many_arguments)]
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        sheet: &mut Worksheet,
        shared_strings: &[CellValue],
        styles: &ParsedStyles,
        link_targets: &AHashMap<String, String>,
        date_1904: bool,
    ) -> XlsxResult<()> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml = Reader::from_reader(BufReader::new(file));
        xml.trim_text(false);

        let mut buf = Vec::new();

        // Current cell state
        let mut cell_ref: Option<CellAddress> = None;
        let mut cell_type: Option<String> = None;
        let mut cell_style: Option<u32> = None;
        let mut value_text: Option<String> = None;
        let mut formula_text: Option<String> = None;
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline_text = false;
        let mut inline_text = String::new();

        loop {
            let event = read_event(&mut xml, &mut buf, path)?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    match e.name().as_ref() {
                        b"sheetFormatPr" => {
                            if let Some(w) = attr(e, b"defaultColWidth").and_then(|v| v.parse().ok())
                            {
                                sheet.set_default_column_width(w);
                            }
                            if let Some(h) =
                                attr(e, b"defaultRowHeight").and_then(|v| v.parse().ok())
                            {
                                sheet.set_default_row_height(h);
                            }
                        }

                        b"col" => {
                            let min: u32 =
                                attr(e, b"min").and_then(|v| v.parse().ok()).unwrap_or(1);
                            let max: u32 =
                                attr(e, b"max").and_then(|v| v.parse().ok()).unwrap_or(min);
                            let width: Option<f64> =
                                attr(e, b"width").and_then(|v| v.parse().ok());
                            let custom = attr(e, b"customWidth")
                                .map(|v| v == "1" || v == "true")
                                .unwrap_or(false);
                            let hidden = attr(e, b"hidden")
                                .map(|v| v == "1" || v == "true")
                                .unwrap_or(false);

                            for col in (min.saturating_sub(1))..max.min(u32::from(u16::MAX)) {
                                let col = col as u16;
                                if let (Some(w), true) = (width, custom) {
                                    sheet.set_column_width(col, w);
                                }
                                if hidden {
                                    sheet.set_column_hidden(col, true);
                                }
                            }
                        }

                        b"row" => {
                            let row: Option<u32> = attr(e, b"r")
                                .and_then(|v| v.parse::<u32>().ok())
                                .map(|r| r - 1);
                            let ht: Option<f64> = attr(e, b"ht").and_then(|v| v.parse().ok());
                            let custom = attr(e, b"customHeight")
                                .map(|v| v == "1" || v == "true")
                                .unwrap_or(false);
                            let hidden = attr(e, b"hidden")
                                .map(|v| v == "1" || v == "true")
                                .unwrap_or(false);

                            if let Some(row) = row {
                                if let (Some(ht), true) = (ht, custom) {
                                    sheet.set_row_height(row, ht);
                                }
                                if hidden {
                                    sheet.set_row_hidden(row, true);
                                }
                            }
                        }

                        b"c" => {
                            cell_ref = attr(e, b"r").and_then(|v| CellAddress::parse(&v).ok());
                            cell_type = attr(e, b"t");
                            cell_style = attr(e, b"s").and_then(|v| v.parse().ok());
                            value_text = None;
                            formula_text = None;
                            inline_text.clear();

                            if is_empty {
                                Self::finish_cell(
                                    sheet,
                                    cell_ref.take(),
                                    cell_type.take(),
                                    cell_style.take(),
                                    None,
                                    None,
                                    "",
                                    shared_strings,
                                    styles,
                                    date_1904,
                                );
                            }
                        }

                        // Self-closed variants (e.g. a shared `<f/>`) carry
                        // no text and must not flip the state on
                        b"v" if !is_empty => in_value = true,
                        b"f" if !is_empty => in_formula = true,
                        b"t" if !is_empty => in_inline_text = true,

                        b"mergeCell" => {
                            if let Some(range) =
                                attr(e, b"ref").and_then(|v| CellRange::parse(&v).ok())
                            {
                                if let Err(err) = sheet.merge_cells(&range) {
                                    warn!("skipping merged region {}: {}", range, err);
                                }
                            }
                        }

                        b"pane" => {
                            let frozen = attr(e, b"state")
                                .map(|s| s == "frozen" || s == "frozenSplit")
                                .unwrap_or(false);
                            if frozen {
                                let x: u16 = attr(e, b"xSplit")
                                    .and_then(|v| v.parse().ok())
                                    .unwrap_or(0);
                                let y: u32 = attr(e, b"ySplit")
                                    .and_then(|v| v.parse().ok())
                                    .unwrap_or(0);
                                sheet.set_freeze_panes(y, x);
                            }
                        }

                        b"hyperlink" => {
                            let addr = attr(e, b"ref").and_then(|v| CellAddress::parse(&v).ok());
                            if let Some(addr) = addr {
                                let target = match attr(e, b"r:id") {
                                    Some(rid) => link_targets.get(&rid).cloned(),
                                    None => attr(e, b"location"),
                                };
                                if let Some(target) = target {
                                    let mut link = Hyperlink::new(target);
                                    if let Some(tooltip) = attr(e, b"tooltip") {
                                        link = link.with_tooltip(tooltip);
                                    }
                                    let _ = sheet.set_hyperlink_at(addr.row, addr.col, link);
                                }
                            }
                        }

                        _ => {}
                    }
                }

                Event::Text(e) => {
                    if let Ok(text) = e.unescape() {
                        if in_value {
                            value_text.get_or_insert_with(String::new).push_str(&text);
                        } else if in_formula {
                            formula_text.get_or_insert_with(String::new).push_str(&text);
                        } else if in_inline_text {
                            inline_text.push_str(&text);
                        }
                    }
                }

                Event::End(e) => match e.name().as_ref() {
                    b"v" => in_value = false,
                    b"f" => in_formula = false,
                    b"t" => in_inline_text = false,
                    b"c" => {
                        Self::finish_cell(
                            sheet,
                            cell_ref.take(),
                            cell_type.take(),
                            cell_style.take(),
                            value_text.take(),
                            formula_text.take(),
                            &std::mem::take(&mut inline_text),
                            shared_strings,
                            styles,
                            date_1904,
                        );
                    }
                    _ => {}
                },

                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    /// Materialize one parsed `<c>` element into the sheet
    #[allow(clippy::too_many_arguments)]
    fn finish_cell(
        sheet: &mut Worksheet,
        cell_ref: Option<CellAddress>,
        cell_type: Option<String>,
        cell_style: Option<u32>,
        value_text: Option<String>,
        formula_text: Option<String>,
        inline_text: &str,
        shared_strings: &[CellValue],
        styles: &ParsedStyles,
        date_1904: bool,
    ) {
        let addr = match cell_ref {
            Some(addr) => addr,
            None => return,
        };

        let type_str = cell_type.as_deref().unwrap_or("n");
        let style_idx = cell_style.unwrap_or(0) as usize;
        let is_date = styles.date_flags.get(style_idx).copied().unwrap_or(false);

        let value = if let Some(formula) = formula_text {
            let cached = value_text
                .as_deref()
                .and_then(|v| Self::decode_cached(type_str, v, is_date, date_1904));
            CellValue::Formula {
                text: format!("={}", formula),
                cached_value: cached.map(Box::new),
            }
        } else {
            match type_str {
                "s" => {
                    let idx: usize = value_text
                        .as_deref()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(usize::MAX);
                    match shared_strings.get(idx) {
                        Some(value) => value.clone(),
                        None => {
                            warn!("shared string index {} out of range at {}", idx, addr);
                            CellValue::Empty
                        }
                    }
                }
                "inlineStr" => CellValue::text(decode_excel_escapes(inline_text)),
                "str" => CellValue::text(value_text.unwrap_or_default()),
                "b" => CellValue::Boolean(
                    value_text.as_deref().map(|v| v == "1").unwrap_or(false),
                ),
                "e" => value_text
                    .as_deref()
                    .and_then(CellError::from_str)
                    .map(CellValue::Error)
                    .unwrap_or(CellValue::Empty),
                "d" => value_text
                    .as_deref()
                    .and_then(parse_iso_datetime)
                    .map(CellValue::DateTime)
                    .unwrap_or(CellValue::Empty),
                _ => match value_text.as_deref().and_then(|v| v.parse::<f64>().ok()) {
                    Some(n) if is_date => serial_to_datetime(n, date_1904)
                        .map(CellValue::DateTime)
                        .unwrap_or(CellValue::Number(n)),
                    Some(n) => CellValue::Number(n),
                    None => CellValue::Empty,
                },
            }
        };

        let has_value = !value.is_empty();
        if has_value {
            let _ = sheet.set_value_at(addr.row, addr.col, value);
        }

        if style_idx > 0 {
            if let Some(style) = styles.cell_styles.get(style_idx) {
                let _ = sheet.replace_style_at(addr.row, addr.col, style);
            }
        }
    }

    fn decode_cached(
        type_str: &str,
        value: &str,
        is_date: bool,
        date_1904: bool,
    ) -> Option<CellValue> {
        match type_str {
            "str" => Some(CellValue::text(value)),
            "b" => Some(CellValue::Boolean(value == "1")),
            "e" => CellError::from_str(value).map(CellValue::Error),
            _ => {
                let n: f64 = value.parse().ok()?;
                if is_date {
                    serial_to_datetime(n, date_1904)
                        .map(CellValue::DateTime)
                        .or(Some(CellValue::Number(n)))
                } else {
                    Some(CellValue::Number(n))
                }
            }
        }
    }

    /// Read a comments part into the sheet
    fn read_comments<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        sheet: &mut Worksheet,
    ) -> XlsxResult<()> {
        let file = match archive.by_name(path) {
            Ok(f) => f,
            Err(_) => {
                warn!("comments part {} referenced but missing", path);
                return Ok(());
            }
        };

        let mut xml = Reader::from_reader(BufReader::new(file));
        xml.trim_text(false);

        let mut buf = Vec::new();
        let mut authors: Vec<String> = Vec::new();

        let mut in_author = false;
        let mut author_text = String::new();
        let mut current_ref: Option<CellAddress> = None;
        let mut current_author: usize = 0;
        let mut in_comment_text = false;
        let mut comment_text = String::new();

        loop {
            match read_event(&mut xml, &mut buf, path)? {
                Event::Start(e) => match e.name().as_ref() {
                    b"author" => {
                        in_author = true;
                        author_text.clear();
                    }
                    b"comment" => {
                        current_ref = attr(&e, b"ref").and_then(|v| CellAddress::parse(&v).ok());
                        current_author = attr(&e, b"authorId")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0);
                        comment_text.clear();
                    }
                    b"t" => in_comment_text = true,
                    _ => {}
                },
                Event::Text(e) => {
                    if let Ok(text) = e.unescape() {
                        if in_author {
                            author_text.push_str(&text);
                        } else if in_comment_text {
                            comment_text.push_str(&text);
                        }
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    b"author" => {
                        authors.push(author_text.clone());
                        in_author = false;
                    }
                    b"t" => in_comment_text = false,
                    b"comment" => {
                        if let Some(addr) = current_ref.take() {
                            let author = authors
                                .get(current_author)
                                .cloned()
                                .unwrap_or_default();
                            let text = decode_excel_escapes(&comment_text);
                            let _ = sheet.set_comment_at(
                                addr.row,
                                addr.col,
                                CellComment::new(author, text),
                            );
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    /// Read document properties from docProps/core.xml, if present
    fn read_core_props<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        workbook: &mut Workbook,
    ) -> XlsxResult<()> {
        let file = match archive.by_name(part::CORE_PROPS) {
            Ok(f) => f,
            Err(_) => return Ok(()),
        };

        let mut xml = Reader::from_reader(BufReader::new(file));
        xml.trim_text(true);

        let mut buf = Vec::new();
        let mut current: Option<&'static str> = None;
        let mut text = String::new();

        loop {
            match read_event(&mut xml, &mut buf, part::CORE_PROPS)? {
                Event::Start(e) => {
                    current = match e.name().as_ref() {
                        b"dc:title" => Some("title"),
                        b"dc:subject" => Some("subject"),
                        b"dc:creator" => Some("creator"),
                        b"dcterms:created" => Some("created"),
                        b"dcterms:modified" => Some("modified"),
                        _ => None,
                    };
                    text.clear();
                }
                Event::Text(e) => {
                    if current.is_some() {
                        if let Ok(t) = e.unescape() {
                            text.push_str(&t);
                        }
                    }
                }
                Event::End(_) => {
                    if let Some(field) = current.take() {
                        if !text.is_empty() {
                            let props = workbook.properties_mut();
                            match field {
                                "title" => props.title = Some(text.clone()),
                                "subject" => props.subject = Some(text.clone()),
                                "creator" => props.author = Some(text.clone()),
                                "created" => props.created = Some(text.clone()),
                                "modified" => props.modified = Some(text.clone()),
                                _ => {}
                            }
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

/// Read one XML event, wrapping failures with part and position
fn read_event<'b, R: std::io::BufRead>(
    xml: &mut Reader<R>,
    buf: &'b mut Vec<u8>,
    part: &str,
) -> XlsxResult<Event<'b>> {
    xml.read_event_into(buf)
        .map_err(|e| xml_parse_error(part, xml.buffer_position() as u64, e))
}

fn attr(e: &quick_xml::events::BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.to_string())
}

fn apply_run_property(e: &quick_xml::events::BytesStart, font: &mut tide_sheets_core::FontStyle) {
    match e.name().as_ref() {
        b"b" => font.bold = true,
        b"i" => font.italic = true,
        b"u" => font.underline = true,
        b"sz" => {
            if let Some(size) = attr(e, b"val").and_then(|v| v.parse().ok()) {
                font.size = size;
            }
        }
        b"color" => {
            if let Some(color) = attr(e, b"rgb").and_then(|v| tide_sheets_core::Color::from_hex(&v))
            {
                font.color = color;
            }
        }
        b"rFont" => {
            if let Some(name) = attr(e, b"val") {
                font.name = name;
            }
        }
        _ => {}
    }
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn sheet_rels_path(sheet_path: &str) -> String {
    match sheet_path.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", sheet_path),
    }
}

fn parent_dir(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    }
}

/// Resolve a relationship target against a base directory, handling
/// leading `/` and `../` segments
fn resolve_target(base: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn parse_iso_datetime(s: &str) -> Option<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
