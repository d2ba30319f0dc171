//! Date and time functions
//!
//! Dates in the evaluation domain are Excel serial numbers; conversion
//! honors the workbook's 1900/1904 setting through the context.

use chrono::{Datelike, Local, NaiveDate, Timelike};

use crate::error::FormulaResult;
use crate::evaluator::{EvalContext, FormulaValue};
use tide_sheets_core::serial::{datetime_to_serial, serial_to_datetime};
use tide_sheets_core::CellError;

fn serial_arg(value: &FormulaValue) -> Result<f64, CellError> {
    match value {
        FormulaValue::Error(e) => Err(*e),
        other => other.coerce_number(),
    }
}

/// DATE(year, month, day); out-of-range months and days roll over the
/// way Excel normalizes them (month 13 is January of the next year)
pub fn fn_date(args: &[FormulaValue], ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let mut parts = [0i64; 3];
    for (i, slot) in parts.iter_mut().enumerate() {
        match serial_arg(&args[i]) {
            Ok(n) => *slot = n.trunc() as i64,
            Err(e) => return Ok(FormulaValue::Error(e)),
        }
    }
    let [year, month, day] = parts;

    // Normalize the month first, then add the day offset
    let year_carry = (month - 1).div_euclid(12);
    let month_norm = (month - 1).rem_euclid(12) + 1;
    let year = year + year_carry;

    let base = match NaiveDate::from_ymd_opt(year as i32, month_norm as u32, 1) {
        Some(d) => d,
        None => return Ok(FormulaValue::Error(CellError::Num)),
    };
    let date = match base.checked_add_signed(chrono::Duration::days(day - 1)) {
        Some(d) => d,
        None => return Ok(FormulaValue::Error(CellError::Num)),
    };

    let midnight = match date.and_hms_opt(0, 0, 0) {
        Some(dt) => dt,
        None => return Ok(FormulaValue::Error(CellError::Num)),
    };

    let serial = datetime_to_serial(midnight, ctx.date_1904());
    if serial < 0.0 {
        return Ok(FormulaValue::Error(CellError::Num));
    }
    Ok(FormulaValue::Number(serial))
}

pub fn fn_today(_args: &[FormulaValue], ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let now = Local::now().naive_local();
    let midnight = now
        .date()
        .and_hms_opt(0, 0, 0)
        .unwrap_or(now);
    Ok(FormulaValue::Number(datetime_to_serial(
        midnight,
        ctx.date_1904(),
    )))
}

pub fn fn_now(_args: &[FormulaValue], ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let now = Local::now().naive_local();
    // Truncate sub-second noise so repeated stores stay comparable
    let now = now.with_nanosecond(0).unwrap_or(now);
    Ok(FormulaValue::Number(datetime_to_serial(
        now,
        ctx.date_1904(),
    )))
}

fn date_component(
    args: &[FormulaValue],
    ctx: &EvalContext,
    component: fn(chrono::NaiveDateTime) -> f64,
) -> FormulaResult<FormulaValue> {
    let serial = match serial_arg(&args[0]) {
        Ok(n) => n,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };

    Ok(match serial_to_datetime(serial, ctx.date_1904()) {
        Some(dt) => FormulaValue::Number(component(dt)),
        None => FormulaValue::Error(CellError::Num),
    })
}

pub fn fn_year(args: &[FormulaValue], ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    date_component(args, ctx, |dt| dt.year() as f64)
}

pub fn fn_month(args: &[FormulaValue], ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    date_component(args, ctx, |dt| dt.month() as f64)
}

pub fn fn_day(args: &[FormulaValue], ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    date_component(args, ctx, |dt| dt.day() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tide_sheets_core::Worksheet;

    fn num(n: f64) -> FormulaValue {
        FormulaValue::Number(n)
    }

    #[test]
    fn test_date_and_components() {
        let ws = Worksheet::new("S");
        let ctx = EvalContext::for_sheet(&ws);

        let serial = match fn_date(&[num(2023.0), num(6.0), num(15.0)], &ctx).unwrap() {
            FormulaValue::Number(n) => n,
            other => panic!("expected number, got {:?}", other),
        };
        assert_eq!(serial, 45092.0);

        assert_eq!(fn_year(&[num(serial)], &ctx).unwrap(), num(2023.0));
        assert_eq!(fn_month(&[num(serial)], &ctx).unwrap(), num(6.0));
        assert_eq!(fn_day(&[num(serial)], &ctx).unwrap(), num(15.0));
    }

    #[test]
    fn test_date_month_rollover() {
        let ws = Worksheet::new("S");
        let ctx = EvalContext::for_sheet(&ws);

        // Month 13 of 2022 is January 2023
        let a = fn_date(&[num(2022.0), num(13.0), num(1.0)], &ctx).unwrap();
        let b = fn_date(&[num(2023.0), num(1.0), num(1.0)], &ctx).unwrap();
        assert_eq!(a, b);

        // Day 32 of January is February 1st
        let a = fn_date(&[num(2023.0), num(1.0), num(32.0)], &ctx).unwrap();
        let b = fn_date(&[num(2023.0), num(2.0), num(1.0)], &ctx).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_serial() {
        let ws = Worksheet::new("S");
        let ctx = EvalContext::for_sheet(&ws);
        assert_eq!(
            fn_year(&[num(-5.0)], &ctx).unwrap(),
            FormulaValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_today_is_whole_days() {
        let ws = Worksheet::new("S");
        let ctx = EvalContext::for_sheet(&ws);

        match fn_today(&[], &ctx).unwrap() {
            FormulaValue::Number(n) => assert_eq!(n.fract(), 0.0),
            other => panic!("expected number, got {:?}", other),
        }
    }
}
