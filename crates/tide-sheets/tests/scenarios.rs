//! Scenario suite: end-to-end behaviors spanning the model, the patch
//! algebra, the formula engine, and the streaming paths

use std::collections::HashMap;

use pretty_assertions::assert_eq;
use tide_sheets::prelude::*;
use tide_sheets::{
    evaluate_with_dependency_check, stream_rows, write_streaming, CellKey, FormulaError, RowData,
    SheetSelector, SheetStream, StreamWriteOptions,
};

fn addr(s: &str) -> CellAddress {
    CellAddress::parse(s).unwrap()
}

fn range(s: &str) -> CellRange {
    CellRange::parse(s).unwrap()
}

/// S1: chained formulas evaluate fresh, and overrides propagate through
/// transitive dependents
#[test]
fn scenario_chain_with_overrides() {
    let mut ws = Worksheet::new("S1");
    ws.set_value("A1", 100.0).unwrap();
    ws.set_formula("B1", "=A1*2").unwrap();
    ws.set_formula("C1", "=B1+50").unwrap();

    assert_eq!(
        evaluate_cell(&ws, "C1", &[]).unwrap(),
        CellValue::Number(250.0)
    );

    let overrides = vec![(addr("A1"), CellValue::Number(200.0))];
    assert_eq!(
        evaluate_cell(&ws, "C1", &overrides).unwrap(),
        CellValue::Number(450.0)
    );
}

/// S2: dependency-checked evaluation computes fan-out then fan-in
#[test]
fn scenario_dependency_checked_fanout() {
    let mut ws = Worksheet::new("S2");
    ws.set_value("B2", 10.0).unwrap();
    ws.set_value("B3", 20.0).unwrap();
    ws.set_value("B4", 30.0).unwrap();
    ws.set_formula("B5", "=SUM(B2:B4)").unwrap();
    ws.set_formula("C5", "=SUM(B2:B4)").unwrap();
    ws.set_formula("D5", "=SUM(B2:B4)").unwrap();
    ws.set_formula("E5", "=SUM(B2:B4)").unwrap();
    ws.set_formula("F5", "=SUM(B5:E5)").unwrap();

    let results: HashMap<CellKey, CellValue> = evaluate_with_dependency_check(&ws, &[])
        .unwrap()
        .into_iter()
        .collect();

    for cell in ["B5", "C5", "D5", "E5"] {
        let key = CellKey::from_address(&addr(cell));
        assert_eq!(results[&key], CellValue::Number(60.0), "{}", cell);
    }
    assert_eq!(
        results[&CellKey::from_address(&addr("F5"))],
        CellValue::Number(240.0)
    );
}

/// S3: filling down shifts relative references and preserves anchors
#[test]
fn scenario_fill_down() {
    let mut ws = Worksheet::new("S3");
    ws.set_formula("B1", "=A1*2").unwrap();
    ws.fill(&range("B1"), &range("B1:B3"), FillDirection::Down)
        .unwrap();

    assert_eq!(ws.value("B2").unwrap().formula_text(), Some("=A2*2"));
    assert_eq!(ws.value("B3").unwrap().formula_text(), Some("=A3*2"));

    let mut ws = Worksheet::new("S3b");
    ws.set_formula("B1", "=$A$1*ROW()").unwrap();
    ws.fill(&range("B1"), &range("B1:B3"), FillDirection::Down)
        .unwrap();

    for cell in ["B2", "B3"] {
        assert_eq!(
            ws.value(cell).unwrap().formula_text(),
            Some("=$A$1*ROW()"),
            "{}",
            cell
        );
    }

    // And the filled formulas produce row-dependent values
    ws.set_value("A1", 10.0).unwrap();
    assert_eq!(
        evaluate_cell(&ws, "B3", &[]).unwrap(),
        CellValue::Number(30.0)
    );
}

/// S4: merge interactions with clearing and unmerging
#[test]
fn scenario_merge_and_clear() {
    let ws = Worksheet::new("S4");

    // Merge then clear a covering range: values and merge both go
    let patched = ws
        .apply(
            &Patch::Put(addr("A1"), CellValue::text("title"))
                .then(Patch::Merge(range("A1:D1")))
                .then(Patch::ClearContents(range("A1:D10"))),
        )
        .unwrap();
    assert!(patched.merged_regions().is_empty());
    assert_eq!(patched.value("A1").unwrap(), CellValue::Empty);

    // Merge then unmerge returns to the unmerged state
    let patched = ws
        .apply(&Patch::Merge(range("A1:D1")).then(Patch::Unmerge(range("A1:D1"))))
        .unwrap();
    assert!(patched.merged_regions().is_empty());
}

/// S5: registering identical styles yields one id and one pool entry
#[test]
fn scenario_style_registry_dedup() {
    let mut ws = Worksheet::new("S5");
    let before = ws.style_pool().len();

    let style_a = Style::new().bold(true).fill_color(Color::rgb(0, 0, 255));
    let style_b = Style::new().bold(true).fill_color(Color::rgb(0, 0, 255));

    let id_a = ws.style_pool_mut().get_or_insert(style_a);
    let id_b = ws.style_pool_mut().get_or_insert(style_b);

    assert_eq!(id_a, id_b);
    assert_eq!(ws.style_pool().len(), before + 1);
}

/// S6: a 100,000-row sheet through the streaming writer and back through
/// the streaming reader
#[test]
fn scenario_streaming_large_sheet() {
    const ROWS: u32 = 100_000;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.xlsx");

    let rows = (0..ROWS).map(|r| {
        RowData::new(r)
            .set(0, r as f64)
            .set(1, format!("row {}", r % 1000))
    });

    write_streaming(
        &path,
        vec![SheetStream::new("Big", rows)],
        &StreamWriteOptions::default(),
    )
    .unwrap();

    let mut count = 0u32;
    for row in stream_rows(&path, SheetSelector::Name("Big".into()), &ReadOptions::default())
        .unwrap()
    {
        let row = row.unwrap();
        assert_eq!(row.row, count, "rows must arrive in ascending order");
        assert_eq!(row.cells[&0].as_number(), Some(count as f64));
        assert_eq!(
            row.cells[&1].as_str(),
            Some(format!("row {}", count % 1000).as_str())
        );
        count += 1;
    }
    assert_eq!(count, ROWS);

    // The in-memory reader agrees on a sample
    let wb = Workbook::open(&path).unwrap();
    let sheet = wb.sheet(0).unwrap();
    assert_eq!(sheet.value_at(99_999, 0).as_number(), Some(99_999.0));
}

/// Streaming writer emits merged ranges when asked
#[test]
fn scenario_streaming_merged_ranges() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("merged.xlsx");

    let rows = vec![RowData::new(0).set(0, "spanning")];
    let sheet =
        SheetStream::new("M", rows).with_merged_ranges(vec![range("A1:C1")]);

    write_streaming(&path, vec![sheet], &StreamWriteOptions::default()).unwrap();

    let wb = Workbook::open(&path).unwrap();
    assert_eq!(wb.sheet(0).unwrap().merged_regions(), &[range("A1:C1")]);
}

/// Patch monoid laws: associativity and identity
#[test]
fn law_patch_monoid() {
    let p = Patch::Put(addr("A1"), CellValue::Number(1.0));
    let q = Patch::StyleCell(addr("A1"), Style::new().bold(true));
    let r = Patch::SetRowHeight(0, 20.0);

    assert_eq!(
        p.clone().then(q.clone()).then(r.clone()),
        p.clone().then(q.clone().then(r.clone()))
    );
    assert_eq!(Patch::empty().then(p.clone()), p);
    assert_eq!(p.clone().then(Patch::empty()), p);
}

/// Overwrite law: the last put wins
#[test]
fn law_overwrite() {
    let ws = Worksheet::new("L");
    let both = ws
        .apply(
            &Patch::Put(addr("A1"), CellValue::Number(1.0))
                .then(Patch::Put(addr("A1"), CellValue::Number(2.0))),
        )
        .unwrap();
    let last = ws
        .apply(&Patch::Put(addr("A1"), CellValue::Number(2.0)))
        .unwrap();

    assert_eq!(both.value("A1").unwrap(), last.value("A1").unwrap());
}

/// Lens laws on cell values: get-set, set-get, set-set
#[test]
fn law_value_lens() {
    let mut ws = Worksheet::new("L");
    ws.set_value("A1", 1.0).unwrap();

    // get(set(s, v)) == v
    ws.set_value("B2", "x").unwrap();
    assert_eq!(ws.value("B2").unwrap(), CellValue::text("x"));

    // set(s, get(s)) == s
    let snapshot = ws.value("A1").unwrap();
    let before: Vec<_> = ws.iter_cells().map(|(r, c, d)| (r, c, d.clone())).collect();
    ws.set_value("A1", snapshot).unwrap();
    let after: Vec<_> = ws.iter_cells().map(|(r, c, d)| (r, c, d.clone())).collect();
    assert_eq!(before, after);

    // set(set(s, a), b) == set(s, b)
    ws.set_value("C3", 1.0).unwrap();
    ws.set_value("C3", 2.0).unwrap();
    assert_eq!(ws.value("C3").unwrap(), CellValue::Number(2.0));
}

/// Formula print/parse and shift laws at the API surface
#[test]
fn law_formula_roundtrip_and_shift() {
    for formula in [
        "=SUM(A1:A10)*2",
        "=IF(A1>0,\"pos\",\"neg\")",
        "=$B$2+C3",
        "=Sheet1:Sheet3!A1",
    ] {
        let ast = parse_formula(formula).unwrap();
        assert_eq!(parse_formula(&print_formula(&ast)).unwrap(), ast);
    }

    // Additivity through the text API
    let once = tide_sheets::shift_formula("=A1+$B$1", 2, 3).unwrap();
    let twice = tide_sheets::shift_formula(
        &tide_sheets::shift_formula("=A1+$B$1", 1, 1).unwrap(),
        1,
        2,
    )
    .unwrap();
    assert_eq!(once, twice);
}

/// Cycles are reported with their path, and detection agrees with the
/// topological sort
#[test]
fn scenario_circular_reference() {
    let mut ws = Worksheet::new("C");
    ws.set_formula("A1", "=B1+1").unwrap();
    ws.set_formula("B1", "=C1+1").unwrap();
    ws.set_formula("C1", "=A1+1").unwrap();

    match evaluate_with_dependency_check(&ws, &[]) {
        Err(FormulaError::CircularReference(path)) => {
            assert_eq!(path.len(), 3);
            let names: Vec<String> = path.iter().map(|a| a.to_a1_string()).collect();
            assert_eq!(names, vec!["A1", "B1", "C1"]);
        }
        other => panic!("expected CircularReference, got {:?}", other),
    }

    let graph = tide_sheets::DependencyGraph::build(&ws);
    assert!(!graph.detect_cycles().is_empty());
    assert!(graph.topological_sort().is_err());
}

/// Codec round-trip through a sheet, including the number-format hint
#[test]
fn scenario_typed_codecs() {
    let mut ws = Worksheet::new("T");

    let date = chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    ws.write_cell("A1", &date).unwrap();
    ws.write_cell("A2", &1234i64).unwrap();
    ws.write_cell("A3", &true).unwrap();

    assert_eq!(ws.read_cell::<chrono::NaiveDate>("A1").unwrap(), Some(date));
    assert_eq!(ws.read_cell::<i64>("A2").unwrap(), Some(1234));
    assert_eq!(ws.read_cell::<bool>("A3").unwrap(), Some(true));

    // The date write registered a date-formatted style
    assert!(ws
        .cell_style_at(0, 0)
        .map(|s| s.number_format.is_date_like())
        .unwrap_or(false));

    // Type-incompatible reads fail with a typed error
    assert!(ws.read_cell::<bool>("A2").is_err());
}
