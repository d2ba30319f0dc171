//! styles.xml read/write helpers

use std::io::BufRead;

use ahash::AHashMap;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::XlsxResult;
use crate::package::{escape_xml_attr, xml_parse_error};
use tide_sheets_core::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, NumberFormat, PatternType, Style, VerticalAlignment, Workbook,
};

/// First id available for custom number formats
const FIRST_CUSTOM_NUMFMT_ID: u32 = 164;

// === Writing ===

/// Workbook-wide style table.
///
/// Per-sheet style pools are merged into one deduplicated cellXfs list;
/// ids are assigned in sheet-then-pool order, so identical workbook
/// values always serialize identical tables.
#[derive(Debug)]
pub(crate) struct StyleTable {
    /// Global, deduplicated styles; index = cellXfs index
    styles: Vec<Style>,
    /// Per-sheet: local pool id -> global xf id
    sheet_maps: Vec<AHashMap<u32, u32>>,
    /// Per-sheet: local pool id -> xf id of the date-formatted variant,
    /// for DateTime cells whose style has no date format of its own
    datetime_maps: Vec<AHashMap<u32, u32>>,
}

impl StyleTable {
    pub(crate) fn build(workbook: &Workbook) -> Self {
        let mut styles: Vec<Style> = Vec::new();
        let mut by_key: AHashMap<String, u32> = AHashMap::new();

        let default = Style::default();
        by_key.insert(default.canonical_key(), 0);
        styles.push(default);

        let mut intern = |style: Style, styles: &mut Vec<Style>| -> u32 {
            let key = style.canonical_key();
            if let Some(&id) = by_key.get(&key) {
                return id;
            }
            let id = styles.len() as u32;
            by_key.insert(key, id);
            styles.push(style);
            id
        };

        let mut sheet_maps = Vec::with_capacity(workbook.sheet_count());
        let mut datetime_maps = Vec::with_capacity(workbook.sheet_count());

        for sheet in workbook.sheets() {
            let mut map: AHashMap<u32, u32> = AHashMap::new();
            let mut dt_map: AHashMap<u32, u32> = AHashMap::new();
            map.insert(0, 0);

            for (_row, _col, cell) in sheet.iter_cells() {
                let local = cell.style_index;
                let style = sheet
                    .style_by_index(local)
                    .cloned()
                    .unwrap_or_default();

                if !map.contains_key(&local) {
                    let xf = intern(style.clone(), &mut styles);
                    map.insert(local, xf);
                }

                // DateTime cells need a date number format to display as
                // dates; synthesize one when the style has none
                if cell.value.as_datetime().is_some()
                    && !style.number_format.is_date_like()
                    && !dt_map.contains_key(&local)
                {
                    let dated = style.with_number_format(NumberFormat::DateTime);
                    let xf = intern(dated, &mut styles);
                    dt_map.insert(local, xf);
                }
            }

            sheet_maps.push(map);
            datetime_maps.push(dt_map);
        }

        Self {
            styles,
            sheet_maps,
            datetime_maps,
        }
    }

    pub(crate) fn xf_for(&self, sheet: usize, local: u32) -> u32 {
        self.sheet_maps
            .get(sheet)
            .and_then(|m| m.get(&local).copied())
            .unwrap_or(0)
    }

    /// The xf for a DateTime cell, substituting the date-formatted
    /// variant when the cell's own style lacks one
    pub(crate) fn xf_for_datetime(&self, sheet: usize, local: u32) -> u32 {
        self.datetime_maps
            .get(sheet)
            .and_then(|m| m.get(&local).copied())
            .unwrap_or_else(|| self.xf_for(sheet, local))
    }

    pub(crate) fn to_xml(&self) -> String {
        // Component tables, deduplicated in first-use order
        let mut fonts: Vec<FontStyle> = Vec::new();
        let mut font_ids: AHashMap<FontStyle, u32> = AHashMap::new();
        let mut fills: Vec<FillStyle> = Vec::new();
        let mut fill_ids: AHashMap<FillStyle, u32> = AHashMap::new();
        let mut borders: Vec<BorderStyle> = Vec::new();
        let mut border_ids: AHashMap<BorderStyle, u32> = AHashMap::new();
        let mut numfmts: Vec<(u32, String)> = Vec::new();
        let mut numfmt_ids: AHashMap<String, u32> = AHashMap::new();

        let default_font = FontStyle::default();
        font_ids.insert(default_font.clone(), 0);
        fonts.push(default_font);

        // The format requires fill 0 = none and fill 1 = gray125
        fills.push(FillStyle::None);
        fills.push(FillStyle::Pattern {
            pattern: PatternType::Gray125,
            foreground: Color::Auto,
            background: Color::Auto,
        });
        fill_ids.insert(FillStyle::None, 0);

        let default_border = BorderStyle::default();
        border_ids.insert(default_border, 0);
        borders.push(default_border);

        struct Resolved {
            font_id: u32,
            fill_id: u32,
            border_id: u32,
            num_fmt_id: u32,
        }

        let mut resolved: Vec<Resolved> = Vec::with_capacity(self.styles.len());
        let mut next_numfmt = FIRST_CUSTOM_NUMFMT_ID;

        for style in &self.styles {
            let font_id = match font_ids.get(&style.font) {
                Some(&id) => id,
                None => {
                    let id = fonts.len() as u32;
                    font_ids.insert(style.font.clone(), id);
                    fonts.push(style.font.clone());
                    id
                }
            };

            let fill_id = match &style.fill {
                FillStyle::None => 0,
                other => match fill_ids.get(other) {
                    Some(&id) => id,
                    None => {
                        let id = fills.len() as u32;
                        fill_ids.insert(other.clone(), id);
                        fills.push(other.clone());
                        id
                    }
                },
            };

            let border_id = match border_ids.get(&style.border) {
                Some(&id) => id,
                None => {
                    let id = borders.len() as u32;
                    border_ids.insert(style.border, id);
                    borders.push(style.border);
                    id
                }
            };

            let num_fmt_id = match style.number_format.ooxml_id() {
                Some(id) => id,
                None => {
                    let code = style.number_format.format_code().to_string();
                    *numfmt_ids.entry(code.clone()).or_insert_with(|| {
                        let id = next_numfmt;
                        next_numfmt += 1;
                        numfmts.push((id, code));
                        id
                    })
                }
            };

            resolved.push(Resolved {
                font_id,
                fill_id,
                border_id,
                num_fmt_id,
            });
        }

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if !numfmts.is_empty() {
            xml.push_str(&format!("\n  <numFmts count=\"{}\">", numfmts.len()));
            for (id, code) in &numfmts {
                xml.push_str(&format!(
                    "\n    <numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                    id,
                    escape_xml_attr(code)
                ));
            }
            xml.push_str("\n  </numFmts>");
        }

        xml.push_str(&format!("\n  <fonts count=\"{}\">", fonts.len()));
        for font in &fonts {
            xml.push_str("\n    ");
            xml.push_str(&write_font(font));
        }
        xml.push_str("\n  </fonts>");

        xml.push_str(&format!("\n  <fills count=\"{}\">", fills.len()));
        for fill in &fills {
            xml.push_str("\n    ");
            xml.push_str(&write_fill(fill));
        }
        xml.push_str("\n  </fills>");

        xml.push_str(&format!("\n  <borders count=\"{}\">", borders.len()));
        for border in &borders {
            xml.push_str("\n    ");
            xml.push_str(&write_border(border));
        }
        xml.push_str("\n  </borders>");

        xml.push_str(
            r#"
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>"#,
        );

        xml.push_str(&format!("\n  <cellXfs count=\"{}\">", self.styles.len()));
        for (style, ids) in self.styles.iter().zip(&resolved) {
            let mut xf = format!(
                "\n    <xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"0\"",
                ids.num_fmt_id, ids.font_id, ids.fill_id, ids.border_id
            );
            if ids.num_fmt_id != 0 {
                xf.push_str(" applyNumberFormat=\"1\"");
            }
            if ids.font_id != 0 {
                xf.push_str(" applyFont=\"1\"");
            }
            if ids.fill_id != 0 {
                xf.push_str(" applyFill=\"1\"");
            }
            if ids.border_id != 0 {
                xf.push_str(" applyBorder=\"1\"");
            }
            if !style.alignment.is_default() {
                xf.push_str(" applyAlignment=\"1\">");
                xf.push_str(&write_alignment(&style.alignment));
                xf.push_str("</xf>");
            } else {
                xf.push_str("/>");
            }
            xml.push_str(&xf);
        }
        xml.push_str("\n  </cellXfs>");

        xml.push_str(
            r#"
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
  <dxfs count="0"/>
  <tableStyles count="0" defaultTableStyle="TableStyleMedium9" defaultPivotStyle="PivotStyleLight16"/>
</styleSheet>"#,
        );

        xml
    }
}

/// A styles.xml whose cellXfs are the default style followed by `styles`
/// in order, with no deduplication; xf ids stay positional. Used by the
/// streaming writer, whose styles are declared up front.
pub(crate) fn styles_xml_for_list(styles: &[Style]) -> String {
    let mut all = Vec::with_capacity(styles.len() + 1);
    all.push(Style::default());
    all.extend_from_slice(styles);

    let table = StyleTable {
        styles: all,
        sheet_maps: Vec::new(),
        datetime_maps: Vec::new(),
    };
    table.to_xml()
}

fn color_attrs(color: &Color) -> String {
    match color {
        Color::Auto => " indexed=\"64\"".to_string(),
        Color::Argb { .. } => format!(
            " rgb=\"{}\"",
            color.to_argb_hex().unwrap_or_else(|| "FF000000".into())
        ),
        Color::Theme { index, tint } => {
            if *tint == 0 {
                format!(" theme=\"{}\"", index)
            } else {
                format!(" theme=\"{}\" tint=\"{}\"", index, (*tint as f64) / 1000.0)
            }
        }
    }
}

fn write_font(font: &FontStyle) -> String {
    let mut s = String::from("<font>");
    if font.bold {
        s.push_str("<b/>");
    }
    if font.italic {
        s.push_str("<i/>");
    }
    if font.underline {
        s.push_str("<u/>");
    }
    s.push_str(&format!("<sz val=\"{}\"/>", font.size));
    if !matches!(font.color, Color::Auto) {
        s.push_str(&format!("<color{}/>", color_attrs(&font.color)));
    }
    s.push_str(&format!("<name val=\"{}\"/>", escape_xml_attr(&font.name)));
    s.push_str("</font>");
    s
}

fn write_fill(fill: &FillStyle) -> String {
    match fill {
        FillStyle::None => "<fill><patternFill patternType=\"none\"/></fill>".to_string(),
        FillStyle::Solid(color) => format!(
            "<fill><patternFill patternType=\"solid\"><fgColor{}/><bgColor indexed=\"64\"/></patternFill></fill>",
            color_attrs(color)
        ),
        FillStyle::Pattern {
            pattern,
            foreground,
            background,
        } => format!(
            "<fill><patternFill patternType=\"{}\"><fgColor{}/><bgColor{}/></patternFill></fill>",
            pattern.ooxml_name(),
            color_attrs(foreground),
            color_attrs(background)
        ),
    }
}

fn write_border(border: &BorderStyle) -> String {
    let mut s = String::from("<border>");
    for (tag, edge) in [
        ("left", &border.left),
        ("right", &border.right),
        ("top", &border.top),
        ("bottom", &border.bottom),
    ] {
        match edge.line.ooxml_name() {
            None => s.push_str(&format!("<{}/>", tag)),
            Some(style) => {
                s.push_str(&format!("<{} style=\"{}\">", tag, style));
                match &edge.color {
                    Some(color) => s.push_str(&format!("<color{}/>", color_attrs(color))),
                    None => s.push_str("<color auto=\"1\"/>"),
                }
                s.push_str(&format!("</{}>", tag));
            }
        }
    }
    s.push_str("<diagonal/></border>");
    s
}

fn write_alignment(alignment: &Alignment) -> String {
    let mut s = String::from("<alignment");
    if let Some(h) = alignment.horizontal.ooxml_name() {
        s.push_str(&format!(" horizontal=\"{}\"", h));
    }
    if let Some(v) = alignment.vertical.ooxml_name() {
        s.push_str(&format!(" vertical=\"{}\"", v));
    }
    if alignment.wrap_text {
        s.push_str(" wrapText=\"1\"");
    }
    s.push_str("/>");
    s
}

// === Reading ===

/// Styles decoded from styles.xml
#[derive(Debug)]
pub(crate) struct ParsedStyles {
    /// cellXfs resolved into complete styles; index = xf id
    pub cell_styles: Vec<Style>,
    /// Per-xf flag: does the number format display serials as dates
    pub date_flags: Vec<bool>,
}

impl Default for ParsedStyles {
    fn default() -> Self {
        Self {
            cell_styles: vec![Style::default()],
            date_flags: vec![false],
        }
    }
}

/// Parse styles.xml into resolved per-xf styles
pub(crate) fn read_styles_xml<R: BufRead>(reader: R, part: &str) -> XlsxResult<ParsedStyles> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut buf = Vec::new();

    let mut fonts: Vec<FontStyle> = Vec::new();
    let mut fills: Vec<FillStyle> = Vec::new();
    let mut borders: Vec<BorderStyle> = Vec::new();
    let mut numfmt_codes: AHashMap<u32, String> = AHashMap::new();

    // Section state
    let mut in_fonts = false;
    let mut in_fills = false;
    let mut in_borders = false;
    let mut in_cell_xfs = false;

    let mut current_font: Option<FontStyle> = None;
    let mut current_fill: Option<FillStyle> = None;
    let mut current_border: Option<BorderStyle> = None;
    let mut border_side: Option<&'static str> = None;
    let mut in_pattern_fill = false;
    let mut pattern_type: Option<String> = None;
    let mut pattern_fg: Option<Color> = None;
    let mut pattern_bg: Option<Color> = None;

    let mut xfs: Vec<(u32, u32, u32, u32, Alignment)> = Vec::new();
    let mut current_xf: Option<(u32, u32, u32, u32, Alignment)> = None;

    loop {
        let event = xml
            .read_event_into(&mut buf)
            .map_err(|e| xml_parse_error(part, xml.buffer_position() as u64, e))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.name().as_ref() {
                    b"fonts" => in_fonts = true,
                    b"fills" => in_fills = true,
                    b"borders" => in_borders = true,
                    b"cellXfs" => in_cell_xfs = true,

                    b"font" if in_fonts => {
                        current_font = Some(FontStyle::default());
                        if is_empty {
                            fonts.push(current_font.take().unwrap_or_default());
                        }
                    }
                    b"b" => {
                        if let Some(f) = current_font.as_mut() {
                            f.bold = true;
                        }
                    }
                    b"i" => {
                        if let Some(f) = current_font.as_mut() {
                            f.italic = true;
                        }
                    }
                    b"u" => {
                        if let Some(f) = current_font.as_mut() {
                            f.underline = true;
                        }
                    }
                    b"sz" => {
                        if let Some(f) = current_font.as_mut() {
                            if let Some(v) = attr_value(e, b"val") {
                                if let Ok(size) = v.parse() {
                                    f.size = size;
                                }
                            }
                        }
                    }
                    b"name" if current_font.is_some() => {
                        if let Some(f) = current_font.as_mut() {
                            if let Some(v) = attr_value(e, b"val") {
                                f.name = v;
                            }
                        }
                    }
                    b"color" => {
                        let color = parse_color(e);
                        if let Some(f) = current_font.as_mut() {
                            f.color = color;
                        } else if in_pattern_fill {
                            // handled by fgColor/bgColor below; plain
                            // <color> only appears in fonts and borders
                        }
                        if let (Some(side), Some(border)) = (border_side, current_border.as_mut()) {
                            let edge = border_edge_mut(border, side);
                            if !matches!(color, Color::Auto) {
                                edge.color = Some(color);
                            }
                        }
                    }

                    b"fill" if in_fills => {
                        current_fill = Some(FillStyle::None);
                        pattern_type = None;
                        pattern_fg = None;
                        pattern_bg = None;
                    }
                    b"patternFill" if in_fills => {
                        in_pattern_fill = !is_empty;
                        pattern_type = attr_value(e, b"patternType");
                        if is_empty {
                            current_fill = Some(resolve_fill(&pattern_type, None, None));
                        }
                    }
                    b"fgColor" if in_pattern_fill => pattern_fg = Some(parse_color(e)),
                    b"bgColor" if in_pattern_fill => pattern_bg = Some(parse_color(e)),

                    b"border" if in_borders => {
                        current_border = Some(BorderStyle::default());
                    }
                    side @ (b"left" | b"right" | b"top" | b"bottom") if current_border.is_some() => {
                        let side_name = match side {
                            b"left" => "left",
                            b"right" => "right",
                            b"top" => "top",
                            _ => "bottom",
                        };
                        if let Some(style) = attr_value(e, b"style") {
                            if let Some(line) = BorderLineStyle::from_ooxml_name(&style) {
                                if let Some(border) = current_border.as_mut() {
                                    border_edge_mut(border, side_name).line = line;
                                }
                            }
                        }
                        border_side = if is_empty { None } else { Some(side_name) };
                    }

                    b"numFmt" => {
                        let id = attr_value(e, b"numFmtId").and_then(|v| v.parse().ok());
                        let code = attr_value(e, b"formatCode");
                        if let (Some(id), Some(code)) = (id, code) {
                            numfmt_codes.insert(id, code);
                        }
                    }

                    b"xf" if in_cell_xfs => {
                        let get = |name: &[u8]| -> u32 {
                            attr_value(e, name)
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0)
                        };
                        let xf = (
                            get(b"numFmtId"),
                            get(b"fontId"),
                            get(b"fillId"),
                            get(b"borderId"),
                            Alignment::default(),
                        );
                        if is_empty {
                            xfs.push(xf);
                        } else {
                            current_xf = Some(xf);
                        }
                    }
                    b"alignment" if in_cell_xfs => {
                        let target = current_xf
                            .as_mut()
                            .map(|xf| &mut xf.4)
                            .or_else(|| xfs.last_mut().map(|xf| &mut xf.4));
                        if let Some(alignment) = target {
                            if let Some(h) = attr_value(e, b"horizontal") {
                                if let Some(h) = HorizontalAlignment::from_ooxml_name(&h) {
                                    alignment.horizontal = h;
                                }
                            }
                            if let Some(v) = attr_value(e, b"vertical") {
                                if let Some(v) = VerticalAlignment::from_ooxml_name(&v) {
                                    alignment.vertical = v;
                                }
                            }
                            if let Some(w) = attr_value(e, b"wrapText") {
                                alignment.wrap_text = w == "1" || w == "true";
                            }
                        }
                    }

                    _ => {}
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"fonts" => in_fonts = false,
                b"fills" => in_fills = false,
                b"borders" => in_borders = false,
                b"cellXfs" => in_cell_xfs = false,
                b"font" => {
                    if let Some(font) = current_font.take() {
                        fonts.push(font);
                    }
                }
                b"patternFill" => {
                    if in_pattern_fill {
                        current_fill = Some(resolve_fill(&pattern_type, pattern_fg, pattern_bg));
                        in_pattern_fill = false;
                    }
                }
                b"fill" => {
                    fills.push(current_fill.take().unwrap_or(FillStyle::None));
                }
                b"border" => {
                    if let Some(border) = current_border.take() {
                        borders.push(border);
                    }
                }
                b"left" | b"right" | b"top" | b"bottom" => border_side = None,
                b"xf" => {
                    if let Some(xf) = current_xf.take() {
                        xfs.push(xf);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    // Resolve each xf into a complete style
    let mut cell_styles = Vec::with_capacity(xfs.len().max(1));
    let mut date_flags = Vec::with_capacity(xfs.len().max(1));

    for (numfmt_id, font_id, fill_id, border_id, alignment) in &xfs {
        let number_format = match NumberFormat::from_ooxml_id(*numfmt_id) {
            Some(fmt) => fmt,
            None => match numfmt_codes.get(numfmt_id) {
                Some(code) => NumberFormat::Custom(code.clone()),
                None if *numfmt_id == 0 => NumberFormat::General,
                None => NumberFormat::Custom(format!("builtin:{}", numfmt_id)),
            },
        };

        let is_date = NumberFormat::id_is_date_like(*numfmt_id)
            || numfmt_codes
                .get(numfmt_id)
                .map(|code| NumberFormat::Custom(code.clone()).is_date_like())
                .unwrap_or(false);

        cell_styles.push(Style {
            font: fonts.get(*font_id as usize).cloned().unwrap_or_default(),
            fill: fills.get(*fill_id as usize).cloned().unwrap_or(FillStyle::None),
            border: borders.get(*border_id as usize).cloned().unwrap_or_default(),
            alignment: *alignment,
            number_format,
        });
        date_flags.push(is_date);
    }

    if cell_styles.is_empty() {
        return Ok(ParsedStyles::default());
    }

    Ok(ParsedStyles {
        cell_styles,
        date_flags,
    })
}

fn resolve_fill(
    pattern_type: &Option<String>,
    fg: Option<Color>,
    bg: Option<Color>,
) -> FillStyle {
    match pattern_type.as_deref() {
        None | Some("none") => FillStyle::None,
        Some("solid") => FillStyle::Solid(fg.unwrap_or(Color::Auto)),
        Some(name) => match PatternType::from_ooxml_name(name) {
            Some(pattern) => FillStyle::Pattern {
                pattern,
                foreground: fg.unwrap_or(Color::Auto),
                background: bg.unwrap_or(Color::Auto),
            },
            None => FillStyle::None,
        },
    }
}

fn border_edge_mut<'a>(border: &'a mut BorderStyle, side: &str) -> &'a mut BorderEdge {
    match side {
        "left" => &mut border.left,
        "right" => &mut border.right,
        "top" => &mut border.top,
        _ => &mut border.bottom,
    }
}

fn attr_value(e: &quick_xml::events::BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.to_string())
}

fn parse_color(e: &quick_xml::events::BytesStart) -> Color {
    if let Some(rgb) = attr_value(e, b"rgb") {
        if let Some(color) = Color::from_hex(&rgb) {
            return color;
        }
    }
    if let Some(theme) = attr_value(e, b"theme").and_then(|v| v.parse().ok()) {
        let tint = attr_value(e, b"tint")
            .and_then(|v| v.parse::<f64>().ok())
            .map(|t| (t * 1000.0).round() as i16)
            .unwrap_or(0);
        return Color::Theme { index: theme, tint };
    }
    Color::Auto
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn test_style_table_dedup_across_sheets() {
        let mut wb = Workbook::new();
        wb.add_sheet_named("Two").unwrap();

        let bold = Style::new().bold(true);
        wb.sheet_mut(0)
            .unwrap()
            .set_value_with_style("A1", 1.0, &bold)
            .unwrap();
        wb.sheet_mut(1)
            .unwrap()
            .set_value_with_style("A1", 2.0, &bold)
            .unwrap();

        let table = StyleTable::build(&wb);
        let xf0 = table.xf_for(0, wb.sheet(0).unwrap().style_index_at(0, 0));
        let xf1 = table.xf_for(1, wb.sheet(1).unwrap().style_index_at(0, 0));
        assert_eq!(xf0, xf1);
        assert_eq!(table.styles.len(), 2); // default + bold
    }

    #[test]
    fn test_datetime_fallback_style() {
        let mut wb = Workbook::new();
        let sheet = wb.sheet_mut(0).unwrap();
        sheet
            .set_value_at(
                0,
                0,
                tide_sheets_core::CellValue::DateTime(
                    chrono::NaiveDate::from_ymd_opt(2023, 1, 1)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap(),
                ),
            )
            .unwrap();

        let table = StyleTable::build(&wb);
        let xf = table.xf_for_datetime(0, 0);
        assert_ne!(xf, 0);
        assert!(table.styles[xf as usize].number_format.is_date_like());
    }

    #[test]
    fn test_styles_xml_roundtrip() {
        let mut wb = Workbook::new();
        let style = Style::new()
            .bold(true)
            .font_size(14.0)
            .fill_color(Color::rgb(255, 199, 206))
            .number_format(NumberFormat::Percent)
            .wrap_text(true);
        wb.sheet_mut(0)
            .unwrap()
            .set_value_with_style("A1", 0.5, &style)
            .unwrap();

        let table = StyleTable::build(&wb);
        let xml = table.to_xml();

        let parsed =
            read_styles_xml(BufReader::new(xml.as_bytes()), "xl/styles.xml").unwrap();
        assert_eq!(parsed.cell_styles.len(), 2);

        let restored = &parsed.cell_styles[1];
        assert!(restored.font.bold);
        assert_eq!(restored.font.size, 14.0);
        assert_eq!(restored.fill, FillStyle::Solid(Color::rgb(255, 199, 206)));
        assert_eq!(restored.number_format, NumberFormat::Percent);
        assert!(restored.alignment.wrap_text);
        assert!(!parsed.date_flags[1]);
    }

    #[test]
    fn test_custom_numfmt_gets_id_164() {
        let mut wb = Workbook::new();
        let style = Style::new().number_format(NumberFormat::Custom("0.000".into()));
        wb.sheet_mut(0)
            .unwrap()
            .set_value_with_style("A1", 1.0, &style)
            .unwrap();

        let xml = StyleTable::build(&wb).to_xml();
        assert!(xml.contains("numFmtId=\"164\" formatCode=\"0.000\""));
    }

    #[test]
    fn test_date_flag_detection() {
        let mut wb = Workbook::new();
        let style = Style::new().number_format(NumberFormat::Date);
        wb.sheet_mut(0)
            .unwrap()
            .set_value_with_style("A1", 45000.0, &style)
            .unwrap();

        let xml = StyleTable::build(&wb).to_xml();
        let parsed =
            read_styles_xml(BufReader::new(xml.as_bytes()), "xl/styles.xml").unwrap();
        assert!(parsed.date_flags[1]);
    }
}
