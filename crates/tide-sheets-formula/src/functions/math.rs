//! Math and aggregation functions

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::FormulaResult;
use crate::evaluator::{EvalContext, FormulaValue};
use tide_sheets_core::CellError;

/// Collect the numeric values of aggregate arguments.
///
/// Direct arguments coerce (numeric text parses, booleans count as 0/1);
/// array elements contribute only genuine numbers, matching how ranges
/// behave in Excel aggregates. Errors abort the collection.
fn numeric_values(args: &[FormulaValue]) -> Result<Vec<f64>, CellError> {
    let mut out = Vec::new();

    for arg in args {
        match arg {
            FormulaValue::Error(e) => return Err(*e),
            FormulaValue::Array(rows) => {
                for row in rows {
                    for cell in row {
                        match cell {
                            FormulaValue::Number(n) => out.push(*n),
                            FormulaValue::Error(e) => return Err(*e),
                            _ => {}
                        }
                    }
                }
            }
            FormulaValue::Empty => {}
            other => out.push(other.coerce_number()?),
        }
    }

    Ok(out)
}

fn single_number(args: &[FormulaValue]) -> Result<f64, CellError> {
    match args.first() {
        Some(FormulaValue::Error(e)) => Err(*e),
        Some(value) => value.coerce_number(),
        None => Err(CellError::Value),
    }
}

pub fn fn_sum(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match numeric_values(args) {
        Ok(values) => FormulaValue::Number(values.iter().sum()),
        Err(e) => FormulaValue::Error(e),
    })
}

pub fn fn_average(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match numeric_values(args) {
        Ok(values) if values.is_empty() => FormulaValue::Error(CellError::Div0),
        Ok(values) => FormulaValue::Number(values.iter().sum::<f64>() / values.len() as f64),
        Err(e) => FormulaValue::Error(e),
    })
}

pub fn fn_min(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match numeric_values(args) {
        // MIN over nothing is 0
        Ok(values) if values.is_empty() => FormulaValue::Number(0.0),
        Ok(values) => FormulaValue::Number(values.iter().cloned().fold(f64::INFINITY, f64::min)),
        Err(e) => FormulaValue::Error(e),
    })
}

pub fn fn_max(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match numeric_values(args) {
        Ok(values) if values.is_empty() => FormulaValue::Number(0.0),
        Ok(values) => {
            FormulaValue::Number(values.iter().cloned().fold(f64::NEG_INFINITY, f64::max))
        }
        Err(e) => FormulaValue::Error(e),
    })
}

pub fn fn_count(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let mut count = 0usize;

    for arg in args {
        match arg {
            FormulaValue::Number(_) => count += 1,
            FormulaValue::Array(rows) => {
                for row in rows {
                    for cell in row {
                        if matches!(cell, FormulaValue::Number(_)) {
                            count += 1;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Ok(FormulaValue::Number(count as f64))
}

pub fn fn_counta(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let mut count = 0usize;

    for arg in args {
        match arg {
            FormulaValue::Empty => {}
            FormulaValue::Array(rows) => {
                for row in rows {
                    for cell in row {
                        if !matches!(cell, FormulaValue::Empty) {
                            count += 1;
                        }
                    }
                }
            }
            _ => count += 1,
        }
    }

    Ok(FormulaValue::Number(count as f64))
}

/// ROUND uses half-away-from-zero, which binary floats cannot express
/// directly; rounding happens in decimal space
pub fn fn_round(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let number = match single_number(args) {
        Ok(n) => n,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };

    let digits = match args.get(1) {
        Some(FormulaValue::Error(e)) => return Ok(FormulaValue::Error(*e)),
        Some(v) => match v.coerce_number() {
            Ok(n) => n.trunc() as i32,
            Err(e) => return Ok(FormulaValue::Error(e)),
        },
        None => 0,
    };

    let rounded = match Decimal::from_f64(number) {
        Some(d) if (0..=28).contains(&digits) => d
            .round_dp_with_strategy(digits as u32, RoundingStrategy::MidpointAwayFromZero)
            .to_f64()
            .unwrap_or(number),
        Some(_) | None => {
            // Negative digits round left of the decimal point
            let factor = 10f64.powi(-digits);
            (number / factor).round() * factor
        }
    };

    Ok(FormulaValue::Number(rounded))
}

pub fn fn_int(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match single_number(args) {
        Ok(n) => FormulaValue::Number(n.floor()),
        Err(e) => FormulaValue::Error(e),
    })
}

pub fn fn_abs(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match single_number(args) {
        Ok(n) => FormulaValue::Number(n.abs()),
        Err(e) => FormulaValue::Error(e),
    })
}

pub fn fn_sqrt(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match single_number(args) {
        Ok(n) if n < 0.0 => FormulaValue::Error(CellError::Num),
        Ok(n) => FormulaValue::Number(n.sqrt()),
        Err(e) => FormulaValue::Error(e),
    })
}

/// MOD's sign follows the divisor
pub fn fn_mod(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let n = match single_number(args) {
        Ok(n) => n,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };
    let d = match args.get(1).map(|v| v.coerce_number()) {
        Some(Ok(d)) => d,
        Some(Err(e)) => return Ok(FormulaValue::Error(e)),
        None => return Ok(FormulaValue::Error(CellError::Value)),
    };

    if d == 0.0 {
        return Ok(FormulaValue::Error(CellError::Div0));
    }

    Ok(FormulaValue::Number(n - d * (n / d).floor()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tide_sheets_core::Worksheet;

    fn ctx_sheet() -> Worksheet {
        Worksheet::new("S")
    }

    fn num(n: f64) -> FormulaValue {
        FormulaValue::Number(n)
    }

    #[test]
    fn test_sum_mixed() {
        let ws = ctx_sheet();
        let ctx = EvalContext::for_sheet(&ws);

        let args = vec![
            num(1.0),
            FormulaValue::Text("2".into()),
            FormulaValue::Bool(true),
            FormulaValue::Array(vec![vec![num(10.0), FormulaValue::Text("x".into())]]),
        ];
        assert_eq!(fn_sum(&args, &ctx).unwrap(), num(14.0));
    }

    #[test]
    fn test_average_empty_is_div0() {
        let ws = ctx_sheet();
        let ctx = EvalContext::for_sheet(&ws);
        let args = vec![FormulaValue::Array(vec![vec![FormulaValue::Text(
            "x".into(),
        )]])];
        assert_eq!(
            fn_average(&args, &ctx).unwrap(),
            FormulaValue::Error(CellError::Div0)
        );
    }

    #[test]
    fn test_min_max() {
        let ws = ctx_sheet();
        let ctx = EvalContext::for_sheet(&ws);
        let args = vec![num(3.0), num(-1.0), num(7.0)];
        assert_eq!(fn_min(&args, &ctx).unwrap(), num(-1.0));
        assert_eq!(fn_max(&args, &ctx).unwrap(), num(7.0));
    }

    #[test]
    fn test_count_vs_counta() {
        let ws = ctx_sheet();
        let ctx = EvalContext::for_sheet(&ws);
        let args = vec![FormulaValue::Array(vec![vec![
            num(1.0),
            FormulaValue::Text("x".into()),
            FormulaValue::Empty,
            FormulaValue::Bool(true),
        ]])];
        assert_eq!(fn_count(&args, &ctx).unwrap(), num(1.0));
        assert_eq!(fn_counta(&args, &ctx).unwrap(), num(3.0));
    }

    #[test]
    fn test_round_half_away_from_zero() {
        let ws = ctx_sheet();
        let ctx = EvalContext::for_sheet(&ws);

        assert_eq!(fn_round(&[num(2.5)], &ctx).unwrap(), num(3.0));
        assert_eq!(fn_round(&[num(-2.5)], &ctx).unwrap(), num(-3.0));
        assert_eq!(fn_round(&[num(1.005), num(2.0)], &ctx).unwrap(), num(1.01));
        assert_eq!(fn_round(&[num(1234.0), num(-2.0)], &ctx).unwrap(), num(1200.0));
    }

    #[test]
    fn test_int_floors() {
        let ws = ctx_sheet();
        let ctx = EvalContext::for_sheet(&ws);
        assert_eq!(fn_int(&[num(1.9)], &ctx).unwrap(), num(1.0));
        assert_eq!(fn_int(&[num(-1.1)], &ctx).unwrap(), num(-2.0));
    }

    #[test]
    fn test_sqrt_domain() {
        let ws = ctx_sheet();
        let ctx = EvalContext::for_sheet(&ws);
        assert_eq!(fn_sqrt(&[num(9.0)], &ctx).unwrap(), num(3.0));
        assert_eq!(
            fn_sqrt(&[num(-1.0)], &ctx).unwrap(),
            FormulaValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_mod_sign_follows_divisor() {
        let ws = ctx_sheet();
        let ctx = EvalContext::for_sheet(&ws);
        assert_eq!(fn_mod(&[num(3.0), num(2.0)], &ctx).unwrap(), num(1.0));
        assert_eq!(fn_mod(&[num(-3.0), num(2.0)], &ctx).unwrap(), num(1.0));
        assert_eq!(fn_mod(&[num(3.0), num(-2.0)], &ctx).unwrap(), num(-1.0));
        assert_eq!(
            fn_mod(&[num(3.0), num(0.0)], &ctx).unwrap(),
            FormulaValue::Error(CellError::Div0)
        );
    }
}
