//! Create a small styled workbook with formulas and save it.
//!
//! Run with: cargo run --example create_xlsx

use tide_sheets::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut workbook = Workbook::new();
    workbook.rename_sheet(0, "Invoice")?;

    let sheet = workbook.sheet_mut(0).unwrap();

    // Header row
    let header = Style::new()
        .bold(true)
        .fill_color(Color::rgb(0xDD, 0xEB, 0xF7));
    sheet.set_value_with_style("A1", "Item", &header)?;
    sheet.set_value_with_style("B1", "Qty", &header)?;
    sheet.set_value_with_style("C1", "Price", &header)?;
    sheet.set_value_with_style("D1", "Total", &header)?;

    // Line items
    let items = [("Widget", 4.0, 9.99), ("Gadget", 2.0, 24.5), ("Gizmo", 7.0, 3.75)];
    for (i, (name, qty, price)) in items.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.set_value_at(row, 0, *name)?;
        sheet.set_value_at(row, 1, *qty)?;
        sheet.set_value_at(row, 2, *price)?;
        sheet.set_formula_at(row, 3, &format!("=B{}*C{}", row + 1, row + 1))?;
    }

    // Grand total
    sheet.set_value_with_style("C5", "Sum", &Style::new().bold(true))?;
    sheet.set_formula("D5", "=SUM(D2:D4)")?;

    sheet.set_column_width(0, 18.0);

    // Evaluate so the file carries fresh cached results
    workbook.recalculate()?;
    workbook.save("invoice.xlsx")?;

    println!(
        "wrote invoice.xlsx; grand total = {}",
        workbook.sheet(0).unwrap().value("D5")?
    );
    Ok(())
}
