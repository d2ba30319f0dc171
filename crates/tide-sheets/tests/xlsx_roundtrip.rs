//! End-to-end tests for XLSX roundtrip (create -> save -> read -> verify)

use std::io::Cursor;

use tide_sheets::prelude::*;
use tide_sheets::{
    BorderEdge, BorderLineStyle, FillStyle, PreservedPart, ReadOptions, RichTextRun, XlsxError,
};

fn roundtrip(wb: &Workbook) -> Workbook {
    let mut buf = Vec::new();
    XlsxWriter::write(wb, Cursor::new(&mut buf), &WriteOptions::default()).unwrap();
    XlsxReader::read(Cursor::new(buf), &ReadOptions::default()).unwrap()
}

/// Test basic roundtrip with numeric values
#[test]
fn test_roundtrip_numbers() {
    let mut wb = Workbook::new();
    let sheet = wb.sheet_mut(0).unwrap();

    sheet.set_value("A1", 42.0).unwrap();
    sheet.set_value("B1", 3.14159).unwrap();
    sheet.set_value("C1", -100.5).unwrap();
    sheet.set_value("A2", 0.0).unwrap();
    sheet.set_value("B2", 1e10).unwrap();

    let wb2 = roundtrip(&wb);
    let sheet2 = wb2.sheet(0).unwrap();

    assert_eq!(sheet2.value("A1").unwrap().as_number(), Some(42.0));
    assert!((sheet2.value("B1").unwrap().as_number().unwrap() - 3.14159).abs() < 1e-10);
    assert_eq!(sheet2.value("C1").unwrap().as_number(), Some(-100.5));
    assert_eq!(sheet2.value("A2").unwrap().as_number(), Some(0.0));
    assert_eq!(sheet2.value("B2").unwrap().as_number(), Some(1e10));
}

/// Test basic roundtrip with string values, including XML entities
#[test]
fn test_roundtrip_strings() {
    let mut wb = Workbook::new();
    let sheet = wb.sheet_mut(0).unwrap();

    sheet.set_value("A1", "Hello, World!").unwrap();
    sheet.set_value("C1", "Special: <>&\"'").unwrap();
    sheet.set_value("A2", "Multi\nLine").unwrap();
    sheet.set_value("B2", "Unicode: \u{1F600}").unwrap();
    sheet.set_value("C2", "  padded  ").unwrap();

    let wb2 = roundtrip(&wb);
    let sheet2 = wb2.sheet(0).unwrap();

    assert_eq!(
        sheet2.value("A1").unwrap().as_str(),
        Some("Hello, World!")
    );
    assert_eq!(
        sheet2.value("C1").unwrap().as_str(),
        Some("Special: <>&\"'")
    );
    assert_eq!(sheet2.value("A2").unwrap().as_str(), Some("Multi\nLine"));
    assert_eq!(
        sheet2.value("B2").unwrap().as_str(),
        Some("Unicode: \u{1F600}")
    );
    assert_eq!(sheet2.value("C2").unwrap().as_str(), Some("  padded  "));
}

/// Shared strings dedup across sheets: repeated text round-trips intact
#[test]
fn test_roundtrip_repeated_strings() {
    let mut wb = Workbook::new();
    wb.add_sheet_named("Two").unwrap();

    for i in 0..2 {
        let sheet = wb.sheet_mut(i).unwrap();
        sheet.set_value("A1", "repeat").unwrap();
        sheet.set_value("A2", "repeat").unwrap();
    }

    let wb2 = roundtrip(&wb);
    for i in 0..2 {
        let sheet = wb2.sheet(i).unwrap();
        assert_eq!(sheet.value("A1").unwrap().as_str(), Some("repeat"));
        assert_eq!(sheet.value("A2").unwrap().as_str(), Some("repeat"));
    }
}

/// Test roundtrip with boolean and error values
#[test]
fn test_roundtrip_booleans_and_errors() {
    let mut wb = Workbook::new();
    let sheet = wb.sheet_mut(0).unwrap();

    sheet.set_value("A1", true).unwrap();
    sheet.set_value("B1", false).unwrap();
    sheet
        .set_value("C1", CellValue::Error(CellError::Div0))
        .unwrap();
    sheet
        .set_value("D1", CellValue::Error(CellError::Na))
        .unwrap();

    let wb2 = roundtrip(&wb);
    let sheet2 = wb2.sheet(0).unwrap();

    assert_eq!(sheet2.value("A1").unwrap().as_bool(), Some(true));
    assert_eq!(sheet2.value("B1").unwrap().as_bool(), Some(false));
    assert_eq!(
        sheet2.value("C1").unwrap(),
        CellValue::Error(CellError::Div0)
    );
    assert_eq!(sheet2.value("D1").unwrap(), CellValue::Error(CellError::Na));
}

/// Test roundtrip with formulas and their cached results
#[test]
fn test_roundtrip_formulas() {
    let mut wb = Workbook::new();
    {
        let sheet = wb.sheet_mut(0).unwrap();
        sheet.set_value("A1", 10.0).unwrap();
        sheet.set_value("A2", 20.0).unwrap();
        sheet.set_formula("A3", "=SUM(A1:A2)").unwrap();
        sheet.set_formula("B1", "=A1*2").unwrap();
        sheet
            .set_formula("C1", "=IF(A1>5,\"Yes\",\"No\")")
            .unwrap();
    }

    wb.recalculate().unwrap();

    let wb2 = roundtrip(&wb);
    let sheet2 = wb2.sheet(0).unwrap();

    let a3 = sheet2.value("A3").unwrap();
    assert_eq!(a3.formula_text(), Some("=SUM(A1:A2)"));
    assert_eq!(a3.as_number(), Some(30.0)); // cached result survived

    assert_eq!(sheet2.value("B1").unwrap().as_number(), Some(20.0));
    assert_eq!(sheet2.value("C1").unwrap().as_str(), Some("Yes"));
}

/// Dates survive through serial numbers and date-formatted styles
#[test]
fn test_roundtrip_dates() {
    let date = chrono::NaiveDate::from_ymd_opt(2023, 6, 15)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap();

    let mut wb = Workbook::new();
    wb.sheet_mut(0)
        .unwrap()
        .set_value("A1", CellValue::DateTime(date))
        .unwrap();

    let wb2 = roundtrip(&wb);
    assert_eq!(
        wb2.sheet(0).unwrap().value("A1").unwrap().as_datetime(),
        Some(date)
    );
}

/// The 1904 date system round-trips and shifts serials accordingly
#[test]
fn test_roundtrip_1904_dates() {
    let date = chrono::NaiveDate::from_ymd_opt(2023, 6, 15)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    let mut wb = Workbook::new();
    wb.settings_mut().date_1904 = true;
    wb.sheet_mut(0)
        .unwrap()
        .set_value("A1", CellValue::DateTime(date))
        .unwrap();

    let wb2 = roundtrip(&wb);
    assert!(wb2.settings().date_1904);
    assert_eq!(
        wb2.sheet(0).unwrap().value("A1").unwrap().as_datetime(),
        Some(date)
    );
}

/// Styles round-trip: font, fill, border, alignment, number format
#[test]
fn test_roundtrip_styles() {
    let mut wb = Workbook::new();
    let style = Style::new()
        .bold(true)
        .italic(true)
        .font_size(14.0)
        .font_name("Arial")
        .font_color(Color::rgb(0x80, 0, 0))
        .fill_color(Color::rgb(255, 255, 0))
        .border_all(BorderEdge::new(BorderLineStyle::Thin))
        .number_format(NumberFormat::PercentDecimal)
        .wrap_text(true);

    wb.sheet_mut(0)
        .unwrap()
        .set_value_with_style("B2", 0.125, &style)
        .unwrap();

    let wb2 = roundtrip(&wb);
    let sheet2 = wb2.sheet(0).unwrap();
    let restored = sheet2.cell_style_at(1, 1).expect("style missing");

    assert!(restored.font.bold);
    assert!(restored.font.italic);
    assert_eq!(restored.font.size, 14.0);
    assert_eq!(restored.font.name, "Arial");
    assert_eq!(restored.font.color, Color::rgb(0x80, 0, 0));
    assert_eq!(restored.fill, FillStyle::Solid(Color::rgb(255, 255, 0)));
    assert_eq!(restored.border.left.line, BorderLineStyle::Thin);
    assert_eq!(restored.number_format, NumberFormat::PercentDecimal);
    assert!(restored.alignment.wrap_text);
}

/// Style-only cells survive the roundtrip
#[test]
fn test_roundtrip_style_only_cell() {
    let mut wb = Workbook::new();
    wb.sheet_mut(0)
        .unwrap()
        .set_style("D4", &Style::new().fill_color(Color::RED))
        .unwrap();

    let wb2 = roundtrip(&wb);
    let sheet2 = wb2.sheet(0).unwrap();
    assert_eq!(
        sheet2.cell_style_at(3, 3).map(|s| s.fill.clone()),
        Some(FillStyle::Solid(Color::RED))
    );
    // The open question is resolved as: style-only cells are "used"
    assert!(sheet2.used_range().unwrap().contains(&CellAddress::parse("D4").unwrap()));
}

/// Merged regions, column widths, row heights, hidden flags
#[test]
fn test_roundtrip_layout() {
    let mut wb = Workbook::new();
    {
        let sheet = wb.sheet_mut(0).unwrap();
        sheet.set_value("A1", "title").unwrap();
        sheet
            .merge_cells(&CellRange::parse("A1:D1").unwrap())
            .unwrap();
        sheet.set_column_width(0, 25.5);
        sheet.set_row_height(0, 30.0);
        sheet.set_column_hidden(2, true);
        sheet.set_row_hidden(4, true);
        sheet.set_freeze_panes(1, 0);
    }

    let wb2 = roundtrip(&wb);
    let sheet2 = wb2.sheet(0).unwrap();

    assert_eq!(sheet2.merged_regions().len(), 1);
    assert_eq!(
        sheet2.merged_regions()[0],
        CellRange::parse("A1:D1").unwrap()
    );
    assert!((sheet2.column_width(0) - 25.5).abs() < 1e-9);
    assert!((sheet2.row_height(0) - 30.0).abs() < 1e-9);
    assert!(sheet2.is_column_hidden(2));
    assert!(sheet2.is_row_hidden(4));
    assert_eq!(sheet2.freeze_panes().map(|f| (f.row, f.col)), Some((1, 0)));
}

/// Comments round-trip with authors
#[test]
fn test_roundtrip_comments() {
    let mut wb = Workbook::new();
    {
        let sheet = wb.sheet_mut(0).unwrap();
        sheet.set_value("A1", 1.0).unwrap();
        sheet
            .set_comment("A1", CellComment::new("Reviewer", "Check this value"))
            .unwrap();
        sheet
            .set_comment("C3", CellComment::new("Author Two", "Note on empty cell"))
            .unwrap();
    }

    let wb2 = roundtrip(&wb);
    let sheet2 = wb2.sheet(0).unwrap();

    let c1 = sheet2.comment("A1").unwrap().expect("comment missing");
    assert_eq!(c1.author, "Reviewer");
    assert_eq!(c1.text, "Check this value");

    let c2 = sheet2.comment("C3").unwrap().expect("comment missing");
    assert_eq!(c2.author, "Author Two");
}

/// Hyperlinks: external URL and internal location
#[test]
fn test_roundtrip_hyperlinks() {
    let mut wb = Workbook::new();
    wb.add_sheet_named("Data").unwrap();
    {
        let sheet = wb.sheet_mut(0).unwrap();
        sheet.set_value("A1", "site").unwrap();
        sheet
            .set_hyperlink_at(0, 0, Hyperlink::new("https://example.com/").with_tooltip("go"))
            .unwrap();
        sheet.set_value("A2", "jump").unwrap();
        sheet
            .set_hyperlink_at(1, 0, Hyperlink::new("Data!B2"))
            .unwrap();
    }

    let wb2 = roundtrip(&wb);
    let sheet2 = wb2.sheet(0).unwrap();

    let external = sheet2.hyperlink_at(0, 0).expect("external link missing");
    assert_eq!(external.target, "https://example.com/");
    assert_eq!(external.tooltip.as_deref(), Some("go"));
    assert!(!external.is_internal());

    let internal = sheet2.hyperlink_at(1, 0).expect("internal link missing");
    assert_eq!(internal.target, "Data!B2");
    assert!(internal.is_internal());
}

/// Rich text round-trips with per-run fonts
#[test]
fn test_roundtrip_rich_text() {
    let mut wb = Workbook::new();
    let runs = vec![
        RichTextRun::plain("normal "),
        RichTextRun::styled("bold", tide_sheets::FontStyle::default().with_bold(true)),
    ];
    wb.sheet_mut(0)
        .unwrap()
        .set_value("A1", CellValue::RichText(runs))
        .unwrap();

    let wb2 = roundtrip(&wb);
    match wb2.sheet(0).unwrap().value("A1").unwrap() {
        CellValue::RichText(runs) => {
            assert_eq!(runs.len(), 2);
            assert_eq!(runs[0].text, "normal ");
            assert!(runs[0].font.is_none());
            assert_eq!(runs[1].text, "bold");
            assert!(runs[1].font.as_ref().unwrap().bold);
        }
        other => panic!("expected rich text, got {:?}", other),
    }
}

/// Multiple sheets with names and active index
#[test]
fn test_roundtrip_multiple_sheets() {
    let mut wb = Workbook::new();
    wb.add_sheet_named("Data").unwrap();
    wb.add_sheet_named("Summary 2024").unwrap();
    wb.activate(2).unwrap();

    wb.sheet_mut(1).unwrap().set_value("A1", 1.0).unwrap();
    wb.sheet_mut(2).unwrap().set_value("A1", 2.0).unwrap();

    let wb2 = roundtrip(&wb);
    assert_eq!(wb2.sheet_count(), 3);
    assert_eq!(wb2.sheet(1).unwrap().name(), "Data");
    assert_eq!(wb2.sheet(2).unwrap().name(), "Summary 2024");
    assert_eq!(wb2.active_sheet(), 2);
    assert_eq!(wb2.sheet(2).unwrap().value("A1").unwrap().as_number(), Some(2.0));
}

/// Document properties round-trip
#[test]
fn test_roundtrip_properties() {
    let mut wb = Workbook::new();
    wb.properties_mut().title = Some("Quarterly".into());
    wb.properties_mut().author = Some("Finance".into());
    wb.properties_mut().created = Some("2024-03-01T09:00:00Z".into());

    let wb2 = roundtrip(&wb);
    assert_eq!(wb2.properties().title.as_deref(), Some("Quarterly"));
    assert_eq!(wb2.properties().author.as_deref(), Some("Finance"));
    assert_eq!(
        wb2.properties().created.as_deref(),
        Some("2024-03-01T09:00:00Z")
    );
}

/// Unknown parts are preserved verbatim through a read/write cycle
#[test]
fn test_roundtrip_preserves_unknown_parts() {
    let mut wb = Workbook::new();
    wb.sheet_mut(0).unwrap().set_value("A1", 1.0).unwrap();
    wb.add_preserved_part(PreservedPart {
        name: "xl/vbaProject.bin".into(),
        content_type: Some("application/vnd.ms-office.vbaProject".into()),
        data: vec![0xCC, 0x01, 0x02, 0x03],
    });

    let wb2 = roundtrip(&wb);
    let part = wb2
        .preserved_parts()
        .iter()
        .find(|p| p.name == "xl/vbaProject.bin")
        .expect("preserved part lost");
    assert_eq!(part.data, vec![0xCC, 0x01, 0x02, 0x03]);
    assert_eq!(
        part.content_type.as_deref(),
        Some("application/vnd.ms-office.vbaProject")
    );

    // And it survives a second cycle
    let wb3 = roundtrip(&wb2);
    assert!(wb3
        .preserved_parts()
        .iter()
        .any(|p| p.name == "xl/vbaProject.bin"));
}

/// Byte-identical writes for identical inputs, including after a
/// read/write cycle
#[test]
fn test_deterministic_bytes() {
    let mut wb = Workbook::new();
    {
        let sheet = wb.sheet_mut(0).unwrap();
        sheet.set_value("A1", "x").unwrap();
        sheet.set_value("B1", 1.5).unwrap();
        sheet
            .set_style("A1", &Style::new().bold(true))
            .unwrap();
    }

    let mut first = Vec::new();
    XlsxWriter::write(&wb, Cursor::new(&mut first), &WriteOptions::default()).unwrap();
    let mut second = Vec::new();
    XlsxWriter::write(&wb, Cursor::new(&mut second), &WriteOptions::default()).unwrap();
    assert_eq!(first, second);

    // write(read(write(wb))) is byte-identical to write(read(...)) again
    let reread = XlsxReader::read(Cursor::new(first.clone()), &ReadOptions::default()).unwrap();
    let mut third = Vec::new();
    XlsxWriter::write(&reread, Cursor::new(&mut third), &WriteOptions::default()).unwrap();
    let reread2 = XlsxReader::read(Cursor::new(third.clone()), &ReadOptions::default()).unwrap();
    let mut fourth = Vec::new();
    XlsxWriter::write(&reread2, Cursor::new(&mut fourth), &WriteOptions::default()).unwrap();
    assert_eq!(third, fourth);
}

/// File-based save/open through the extension trait, with atomic output
#[test]
fn test_save_and_open_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xlsx");

    let mut wb = Workbook::new();
    wb.sheet_mut(0).unwrap().set_value("A1", "disk").unwrap();
    wb.save(&path).unwrap();

    let wb2 = Workbook::open(&path).unwrap();
    assert_eq!(wb2.sheet(0).unwrap().value("A1").unwrap().as_str(), Some("disk"));

    // No stray temp files left next to the output
    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries.len(), 1);
}

/// A hostile archive with an absurd compression ratio is rejected
#[test]
fn test_zip_bomb_rejected() {
    use std::io::Write;

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<Types/>").unwrap();
        zip.start_file("xl/workbook.xml", options).unwrap();
        zip.write_all(b"<workbook/>").unwrap();
        // 8 MiB of zeros compresses at a ratio far beyond the limit
        zip.start_file("xl/bomb.xml", options).unwrap();
        zip.write_all(&vec![0u8; 8 * 1024 * 1024]).unwrap();
        zip.finish().unwrap();
    }

    match XlsxReader::read(Cursor::new(buf), &ReadOptions::default()) {
        Err(XlsxError::ZipBombDetected { path, ratio }) => {
            assert_eq!(path, "xl/bomb.xml");
            assert!(ratio > 100.0);
        }
        other => panic!("expected ZipBombDetected, got {:?}", other.map(|_| ())),
    }
}

/// Missing required parts surface as typed errors
#[test]
fn test_missing_workbook_part() {
    use std::io::Write;

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<Types/>").unwrap();
        zip.finish().unwrap();
    }

    assert!(matches!(
        XlsxReader::read(Cursor::new(buf), &ReadOptions::default()),
        Err(XlsxError::MissingWorkbookPart)
    ));
}
