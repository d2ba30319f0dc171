//! Reference shifting (fill/drag)
//!
//! Shifting moves every relative reference component by a delta while
//! leaving `$`-anchored components and 3-D references untouched. A shift
//! that would leave the sheet collapses the reference to `#REF!`, which is
//! what the evaluator reports for a reference dragged off the grid.

use crate::ast::{CellRef, Expr, RangeRef};
use crate::error::FormulaResult;
use crate::parser::parse_formula;
use crate::printer::print_formula;
use tide_sheets_core::{CellAddress, CellError, CellRange, MAX_COLS, MAX_ROWS};

/// Shift all relative references in an expression by (delta_col, delta_row)
pub fn shift(expr: &Expr, delta_col: i64, delta_row: i64) -> Expr {
    match expr {
        Expr::Number(_) | Expr::Text(_) | Expr::Bool(_) | Expr::Error(_) => expr.clone(),

        // 3-D references are not shifted
        Expr::SheetSpan(_) => expr.clone(),

        Expr::Ref(cell_ref) => match shift_address(&cell_ref.address, delta_col, delta_row) {
            Some(address) => Expr::Ref(CellRef {
                sheet: cell_ref.sheet.clone(),
                address,
            }),
            None => Expr::Error(CellError::Ref),
        },

        Expr::Range(range_ref) => {
            // Endpoints shift independently
            let start = shift_address(&range_ref.range.start, delta_col, delta_row);
            let end = shift_address(&range_ref.range.end, delta_col, delta_row);
            match (start, end) {
                (Some(start), Some(end)) => Expr::Range(RangeRef {
                    sheet: range_ref.sheet.clone(),
                    range: CellRange::new(start, end),
                }),
                _ => Expr::Error(CellError::Ref),
            }
        }

        Expr::Unary { op, operand } => Expr::Unary {
            op: *op,
            operand: Box::new(shift(operand, delta_col, delta_row)),
        },

        Expr::Binary { op, lhs, rhs } => Expr::Binary {
            op: *op,
            lhs: Box::new(shift(lhs, delta_col, delta_row)),
            rhs: Box::new(shift(rhs, delta_col, delta_row)),
        },

        Expr::Call { name, args } => Expr::Call {
            name: name.clone(),
            args: args.iter().map(|a| shift(a, delta_col, delta_row)).collect(),
        },
    }
}

/// Shift one address; anchored components stay put. `None` means the
/// reference left the sheet.
fn shift_address(addr: &CellAddress, delta_col: i64, delta_row: i64) -> Option<CellAddress> {
    let col = if addr.col_absolute {
        addr.col as i64
    } else {
        addr.col as i64 + delta_col
    };
    let row = if addr.row_absolute {
        addr.row as i64
    } else {
        addr.row as i64 + delta_row
    };

    if col < 0 || col >= MAX_COLS as i64 || row < 0 || row >= MAX_ROWS as i64 {
        return None;
    }

    Some(CellAddress::with_absolute(
        row as u32,
        col as u16,
        addr.row_absolute,
        addr.col_absolute,
    ))
}

/// Parse, shift, and print a formula in one step
pub fn shift_formula(formula: &str, delta_col: i64, delta_row: i64) -> FormulaResult<String> {
    let ast = parse_formula(formula)?;
    Ok(print_formula(&shift(&ast, delta_col, delta_row)))
}
