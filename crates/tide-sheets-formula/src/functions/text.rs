//! Text functions
//!
//! Positions and lengths are in characters, not bytes.

use crate::error::FormulaResult;
use crate::evaluator::{EvalContext, FormulaValue};
use tide_sheets_core::CellError;

fn text_arg(value: &FormulaValue) -> Result<String, CellError> {
    match value {
        FormulaValue::Error(e) => Err(*e),
        FormulaValue::Array(_) => Err(CellError::Value),
        other => Ok(other.as_text()),
    }
}

fn count_arg(value: Option<&FormulaValue>, default: f64) -> Result<f64, CellError> {
    match value {
        None => Ok(default),
        Some(FormulaValue::Error(e)) => Err(*e),
        Some(v) => v.coerce_number(),
    }
}

pub fn fn_concat(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let mut out = String::new();
    for arg in args {
        match arg {
            FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
            FormulaValue::Array(rows) => {
                for row in rows {
                    for cell in row {
                        if let FormulaValue::Error(e) = cell {
                            return Ok(FormulaValue::Error(*e));
                        }
                        out.push_str(&cell.as_text());
                    }
                }
            }
            other => out.push_str(&other.as_text()),
        }
    }
    Ok(FormulaValue::Text(out))
}

pub fn fn_left(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let (text, count) = match (text_arg(&args[0]), count_arg(args.get(1), 1.0)) {
        (Ok(t), Ok(n)) => (t, n),
        (Err(e), _) | (_, Err(e)) => return Ok(FormulaValue::Error(e)),
    };

    if count < 0.0 {
        return Ok(FormulaValue::Error(CellError::Value));
    }

    Ok(FormulaValue::Text(
        text.chars().take(count as usize).collect(),
    ))
}

pub fn fn_right(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let (text, count) = match (text_arg(&args[0]), count_arg(args.get(1), 1.0)) {
        (Ok(t), Ok(n)) => (t, n),
        (Err(e), _) | (_, Err(e)) => return Ok(FormulaValue::Error(e)),
    };

    if count < 0.0 {
        return Ok(FormulaValue::Error(CellError::Value));
    }

    let len = text.chars().count();
    let skip = len.saturating_sub(count as usize);
    Ok(FormulaValue::Text(text.chars().skip(skip).collect()))
}

pub fn fn_mid(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let text = match text_arg(&args[0]) {
        Ok(t) => t,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };
    let (start, count) = match (count_arg(args.get(1), 1.0), count_arg(args.get(2), 0.0)) {
        (Ok(s), Ok(n)) => (s, n),
        (Err(e), _) | (_, Err(e)) => return Ok(FormulaValue::Error(e)),
    };

    // start is 1-based
    if start < 1.0 || count < 0.0 {
        return Ok(FormulaValue::Error(CellError::Value));
    }

    Ok(FormulaValue::Text(
        text.chars()
            .skip(start as usize - 1)
            .take(count as usize)
            .collect(),
    ))
}

pub fn fn_len(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match text_arg(&args[0]) {
        Ok(t) => FormulaValue::Number(t.chars().count() as f64),
        Err(e) => FormulaValue::Error(e),
    })
}

pub fn fn_upper(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match text_arg(&args[0]) {
        Ok(t) => FormulaValue::Text(t.to_uppercase()),
        Err(e) => FormulaValue::Error(e),
    })
}

pub fn fn_lower(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match text_arg(&args[0]) {
        Ok(t) => FormulaValue::Text(t.to_lowercase()),
        Err(e) => FormulaValue::Error(e),
    })
}

/// TRIM removes leading/trailing spaces and collapses runs of interior
/// spaces to one
pub fn fn_trim(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match text_arg(&args[0]) {
        Ok(t) => FormulaValue::Text(t.split_whitespace().collect::<Vec<_>>().join(" ")),
        Err(e) => FormulaValue::Error(e),
    })
}

/// Minimal TEXT: decimal places from a "0.00"-style code, percent and
/// thousands variants, everything else falls back to plain rendering
pub fn fn_text(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let format = match text_arg(&args[1]) {
        Ok(f) => f,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };

    if let FormulaValue::Error(e) = &args[0] {
        return Ok(FormulaValue::Error(*e));
    }

    let number = match args[0].as_number() {
        Some(n) => n,
        None => return Ok(FormulaValue::Text(args[0].as_text())),
    };

    let rendered = if let Some(stripped) = format.strip_suffix('%') {
        let decimals = decimals_in(stripped);
        format!("{:.*}%", decimals, number * 100.0)
    } else if format.contains(',') {
        let decimals = decimals_in(&format);
        group_thousands(number, decimals)
    } else if format.contains('0') || format.contains('#') {
        format!("{:.*}", decimals_in(&format), number)
    } else {
        args[0].as_text()
    };

    Ok(FormulaValue::Text(rendered))
}

fn decimals_in(format: &str) -> usize {
    match format.find('.') {
        Some(dot) => format[dot + 1..]
            .chars()
            .take_while(|&c| c == '0' || c == '#')
            .count(),
        None => 0,
    }
}

fn group_thousands(number: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, number.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted, None),
    };

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    let sign = if number < 0.0 { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

pub fn fn_value(args: &[FormulaValue], _ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    Ok(match &args[0] {
        FormulaValue::Error(e) => FormulaValue::Error(*e),
        FormulaValue::Number(n) => FormulaValue::Number(*n),
        other => {
            let text = other.as_text();
            let cleaned = text.trim().trim_end_matches('%');
            match cleaned.replace(',', "").parse::<f64>() {
                Ok(n) if text.trim().ends_with('%') => FormulaValue::Number(n / 100.0),
                Ok(n) => FormulaValue::Number(n),
                Err(_) => FormulaValue::Error(CellError::Value),
            }
        }
    })
}
