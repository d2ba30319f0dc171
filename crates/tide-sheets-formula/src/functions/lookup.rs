//! Lookup and reference functions

use std::cmp::Ordering;

use crate::error::FormulaResult;
use crate::evaluator::{compare_values, EvalContext, FormulaValue};
use tide_sheets_core::CellError;

fn array_arg(value: &FormulaValue) -> Result<&Vec<Vec<FormulaValue>>, CellError> {
    match value {
        FormulaValue::Array(rows) => Ok(rows),
        FormulaValue::Error(e) => Err(*e),
        _ => Err(CellError::Value),
    }
}

fn index_arg(value: &FormulaValue) -> Result<i64, CellError> {
    match value {
        FormulaValue::Error(e) => Err(*e),
        other => Ok(other.coerce_number()?.trunc() as i64),
    }
}

/// VLOOKUP(lookup_value, table, col_index, [range_lookup])
///
/// Exact matching when `range_lookup` is FALSE; otherwise the approximate
/// mode returns the last row whose first column is <= the lookup value
/// (the table must be sorted ascending for that to be meaningful).
pub fn fn_vlookup(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    if let FormulaValue::Error(e) = &args[0] {
        return Ok(FormulaValue::Error(*e));
    }

    let table = match array_arg(&args[1]) {
        Ok(t) => t,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };
    let col_index = match index_arg(&args[2]) {
        Ok(i) => i,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };

    if col_index < 1 {
        return Ok(FormulaValue::Error(CellError::Value));
    }

    let approximate = match args.get(3) {
        None => true,
        Some(FormulaValue::Error(e)) => return Ok(FormulaValue::Error(*e)),
        Some(v) => match v.coerce_bool() {
            Ok(b) => b,
            Err(e) => return Ok(FormulaValue::Error(e)),
        },
    };

    let lookup = &args[0];
    let mut matched: Option<&Vec<FormulaValue>> = None;

    for row in table {
        let key = match row.first() {
            Some(k) => k,
            None => continue,
        };

        if approximate {
            match compare_values(key, lookup) {
                Ordering::Less | Ordering::Equal => matched = Some(row),
                Ordering::Greater => break,
            }
        } else if compare_values(key, lookup) == Ordering::Equal {
            matched = Some(row);
            break;
        }
    }

    let row = match matched {
        Some(row) => row,
        None => return Ok(FormulaValue::Error(CellError::Na)),
    };

    match row.get(col_index as usize - 1) {
        Some(value) => Ok(value.clone()),
        None => Ok(FormulaValue::Error(CellError::Ref)),
    }
}

/// INDEX(array, row_num, [col_num]); both indices are 1-based
pub fn fn_index(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let table = match array_arg(&args[0]) {
        Ok(t) => t,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };
    let row_num = match index_arg(&args[1]) {
        Ok(i) => i,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };
    let col_num = match args.get(2) {
        None => 1,
        Some(v) => match index_arg(v) {
            Ok(i) => i,
            Err(e) => return Ok(FormulaValue::Error(e)),
        },
    };

    if row_num < 1 || col_num < 1 {
        return Ok(FormulaValue::Error(CellError::Value));
    }

    match table
        .get(row_num as usize - 1)
        .and_then(|row| row.get(col_num as usize - 1))
    {
        Some(value) => Ok(value.clone()),
        None => Ok(FormulaValue::Error(CellError::Ref)),
    }
}

/// MATCH(lookup_value, array, [match_type])
///
/// match_type 1 (default): largest value <= lookup (ascending data);
/// 0: first exact match; -1: smallest value >= lookup (descending data).
/// Returns the 1-based position within the flattened vector.
pub fn fn_match(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    if let FormulaValue::Error(e) = &args[0] {
        return Ok(FormulaValue::Error(*e));
    }

    let table = match array_arg(&args[1]) {
        Ok(t) => t,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };
    let match_type = match args.get(2) {
        None => 1,
        Some(v) => match index_arg(v) {
            Ok(i) => i,
            Err(e) => return Ok(FormulaValue::Error(e)),
        },
    };

    // The array must be a single row or a single column
    let values: Vec<&FormulaValue> = if table.len() == 1 {
        table[0].iter().collect()
    } else if table.iter().all(|row| row.len() == 1) {
        table.iter().map(|row| &row[0]).collect()
    } else {
        return Ok(FormulaValue::Error(CellError::Na));
    };

    let lookup = &args[0];
    let mut matched: Option<usize> = None;

    for (i, value) in values.iter().enumerate() {
        let ord = compare_values(value, lookup);
        match match_type {
            0 => {
                if ord == Ordering::Equal {
                    matched = Some(i);
                    break;
                }
            }
            n if n > 0 => match ord {
                Ordering::Less | Ordering::Equal => matched = Some(i),
                Ordering::Greater => break,
            },
            _ => match ord {
                Ordering::Greater | Ordering::Equal => matched = Some(i),
                Ordering::Less => break,
            },
        }
    }

    Ok(match matched {
        Some(i) => FormulaValue::Number((i + 1) as f64),
        None => FormulaValue::Error(CellError::Na),
    })
}

/// ROW() with no argument: 1-based row of the cell being evaluated
pub fn fn_row(_args: &[FormulaValue], ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(ctx.current_row() as f64 + 1.0))
}

/// COLUMN() with no argument: 1-based column of the cell being evaluated
pub fn fn_column(_args: &[FormulaValue], ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(ctx.current_col() as f64 + 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tide_sheets_core::Worksheet;

    fn num(n: f64) -> FormulaValue {
        FormulaValue::Number(n)
    }

    fn text(s: &str) -> FormulaValue {
        FormulaValue::Text(s.into())
    }

    fn table() -> FormulaValue {
        FormulaValue::Array(vec![
            vec![text("apple"), num(1.0), num(10.0)],
            vec![text("banana"), num(2.0), num(20.0)],
            vec![text("cherry"), num(3.0), num(30.0)],
        ])
    }

    #[test]
    fn test_vlookup_exact() {
        let ws = Worksheet::new("S");
        let ctx = EvalContext::for_sheet(&ws);

        let result = fn_vlookup(
            &[text("banana"), table(), num(3.0), FormulaValue::Bool(false)],
            &ctx,
        )
        .unwrap();
        assert_eq!(result, num(20.0));

        let result = fn_vlookup(
            &[text("durian"), table(), num(2.0), FormulaValue::Bool(false)],
            &ctx,
        )
        .unwrap();
        assert_eq!(result, FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_vlookup_approximate() {
        let ws = Worksheet::new("S");
        let ctx = EvalContext::for_sheet(&ws);

        let sorted = FormulaValue::Array(vec![
            vec![num(0.0), text("F")],
            vec![num(60.0), text("D")],
            vec![num(70.0), text("C")],
            vec![num(80.0), text("B")],
            vec![num(90.0), text("A")],
        ]);

        let result = fn_vlookup(&[num(85.0), sorted.clone(), num(2.0)], &ctx).unwrap();
        assert_eq!(result, text("B"));

        let result = fn_vlookup(&[num(-10.0), sorted, num(2.0)], &ctx).unwrap();
        assert_eq!(result, FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_vlookup_column_out_of_range() {
        let ws = Worksheet::new("S");
        let ctx = EvalContext::for_sheet(&ws);

        let result = fn_vlookup(
            &[text("apple"), table(), num(9.0), FormulaValue::Bool(false)],
            &ctx,
        )
        .unwrap();
        assert_eq!(result, FormulaValue::Error(CellError::Ref));
    }

    #[test]
    fn test_index() {
        let ws = Worksheet::new("S");
        let ctx = EvalContext::for_sheet(&ws);

        assert_eq!(
            fn_index(&[table(), num(2.0), num(1.0)], &ctx).unwrap(),
            text("banana")
        );
        assert_eq!(
            fn_index(&[table(), num(9.0), num(1.0)], &ctx).unwrap(),
            FormulaValue::Error(CellError::Ref)
        );
    }

    #[test]
    fn test_match() {
        let ws = Worksheet::new("S");
        let ctx = EvalContext::for_sheet(&ws);

        let column = FormulaValue::Array(vec![vec![num(10.0)], vec![num(20.0)], vec![num(30.0)]]);

        // Exact
        assert_eq!(
            fn_match(&[num(20.0), column.clone(), num(0.0)], &ctx).unwrap(),
            num(2.0)
        );
        // Largest <= lookup
        assert_eq!(
            fn_match(&[num(25.0), column.clone(), num(1.0)], &ctx).unwrap(),
            num(2.0)
        );
        // No match
        assert_eq!(
            fn_match(&[num(5.0), column, num(0.0)], &ctx).unwrap(),
            FormulaValue::Error(CellError::Na)
        );
    }

    #[test]
    fn test_row_column_use_current_cell() {
        let ws = Worksheet::new("S");
        let ctx = EvalContext::for_sheet(&ws);
        ctx.set_current(4, 2);

        assert_eq!(fn_row(&[], &ctx).unwrap(), num(5.0));
        assert_eq!(fn_column(&[], &ctx).unwrap(), num(3.0));
    }
}
