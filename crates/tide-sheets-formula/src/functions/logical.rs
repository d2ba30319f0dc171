//! Logical functions

use crate::error::FormulaResult;
use crate::evaluator::{EvalContext, FormulaValue};
use tide_sheets_core::CellError;

/// Collect boolean test values from arguments; array elements contribute
/// numbers and booleans, text inside arrays is skipped (as Excel does for
/// ranges)
fn bool_values(args: &[FormulaValue]) -> Result<Vec<bool>, CellError> {
    let mut out = Vec::new();

    for arg in args {
        match arg {
            FormulaValue::Error(e) => return Err(*e),
            FormulaValue::Array(rows) => {
                for row in rows {
                    for cell in row {
                        match cell {
                            FormulaValue::Number(n) => out.push(*n != 0.0),
                            FormulaValue::Bool(b) => out.push(*b),
                            FormulaValue::Error(e) => return Err(*e),
                            _ => {}
                        }
                    }
                }
            }
            FormulaValue::Empty => {}
            other => out.push(other.coerce_bool()?),
        }
    }

    if out.is_empty() {
        return Err(CellError::Value);
    }
    Ok(out)
}

/// IF with already-evaluated arguments.
///
/// The evaluator short-circuits IF before argument evaluation; this
/// implementation backs the registry entry for completeness.
pub fn fn_if(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let test = match args[0].coerce_bool() {
        Ok(b) => b,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };

    Ok(if test {
        args[1].clone()
    } else {
        args.get(2).cloned().unwrap_or(FormulaValue::Bool(false))
    })
}

pub fn fn_and(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match bool_values(args) {
        Ok(values) => FormulaValue::Bool(values.iter().all(|&b| b)),
        Err(e) => FormulaValue::Error(e),
    })
}

pub fn fn_or(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match bool_values(args) {
        Ok(values) => FormulaValue::Bool(values.iter().any(|&b| b)),
        Err(e) => FormulaValue::Error(e),
    })
}

pub fn fn_not(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match args[0].coerce_bool() {
        Ok(b) => FormulaValue::Bool(!b),
        Err(e) => FormulaValue::Error(e),
    })
}

pub fn fn_true(_args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Bool(true))
}

pub fn fn_false(_args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Bool(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tide_sheets_core::Worksheet;

    #[test]
    fn test_and_or_not() {
        let ws = Worksheet::new("S");
        let ctx = EvalContext::for_sheet(&ws);

        let t = FormulaValue::Bool(true);
        let f = FormulaValue::Bool(false);

        assert_eq!(
            fn_and(&[t.clone(), t.clone()], &ctx).unwrap(),
            FormulaValue::Bool(true)
        );
        assert_eq!(
            fn_and(&[t.clone(), f.clone()], &ctx).unwrap(),
            FormulaValue::Bool(false)
        );
        assert_eq!(
            fn_or(&[f.clone(), t.clone()], &ctx).unwrap(),
            FormulaValue::Bool(true)
        );
        assert_eq!(fn_not(&[f], &ctx).unwrap(), FormulaValue::Bool(true));
    }

    #[test]
    fn test_numbers_as_booleans() {
        let ws = Worksheet::new("S");
        let ctx = EvalContext::for_sheet(&ws);

        assert_eq!(
            fn_and(&[FormulaValue::Number(1.0), FormulaValue::Number(2.0)], &ctx).unwrap(),
            FormulaValue::Bool(true)
        );
        assert_eq!(
            fn_or(&[FormulaValue::Number(0.0)], &ctx).unwrap(),
            FormulaValue::Bool(false)
        );
    }

    #[test]
    fn test_error_propagates() {
        let ws = Worksheet::new("S");
        let ctx = EvalContext::for_sheet(&ws);

        assert_eq!(
            fn_and(
                &[
                    FormulaValue::Bool(true),
                    FormulaValue::Error(CellError::Na)
                ],
                &ctx
            )
            .unwrap(),
            FormulaValue::Error(CellError::Na)
        );
    }
}
