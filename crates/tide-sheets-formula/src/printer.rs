//! Formula printer
//!
//! The algebraic inverse of the parser: printing a well-formed tree and
//! parsing the result yields a structurally equivalent tree. Parentheses
//! are emitted only where precedence or associativity requires them.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use tide_sheets_core::CellAddress;

/// Precedence of unary operators (tighter than any binary operator)
const UNARY_PRECEDENCE: u8 = 6;

/// Print a formula tree with its leading `=`
pub fn print_formula(expr: &Expr) -> String {
    let mut out = String::from("=");
    write_expr(expr, &mut out);
    out
}

/// Print a formula tree without the leading `=`
pub fn print_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(expr, &mut out);
    out
}

fn write_expr(expr: &Expr, out: &mut String) {
    match expr {
        Expr::Number(n) => {
            out.push_str(&format_number(*n));
        }
        Expr::Text(s) => {
            out.push('"');
            out.push_str(&s.replace('"', "\"\""));
            out.push('"');
        }
        Expr::Bool(b) => out.push_str(if *b { "TRUE" } else { "FALSE" }),
        Expr::Error(e) => out.push_str(e.as_str()),

        Expr::Ref(cell_ref) => {
            if let Some(sheet) = &cell_ref.sheet {
                write_sheet_prefix(sheet, out);
            }
            out.push_str(&cell_ref.address.to_a1_string());
        }

        Expr::Range(range_ref) => {
            if let Some(sheet) = &range_ref.sheet {
                write_sheet_prefix(sheet, out);
            }
            out.push_str(&range_ref.range.start.to_a1_string());
            out.push(':');
            out.push_str(&range_ref.range.end.to_a1_string());
        }

        Expr::SheetSpan(span) => {
            out.push_str(&span.first_sheet);
            out.push(':');
            out.push_str(&span.last_sheet);
            out.push('!');
            out.push_str(&span.address.to_a1_string());
        }

        Expr::Unary { op, operand } => match op {
            UnaryOp::Negate => {
                out.push('-');
                write_operand(operand, UNARY_PRECEDENCE, out);
            }
            UnaryOp::Plus => {
                out.push('+');
                write_operand(operand, UNARY_PRECEDENCE, out);
            }
            UnaryOp::Percent => {
                write_operand(operand, UNARY_PRECEDENCE, out);
                out.push('%');
            }
        },

        Expr::Binary { op, lhs, rhs } => {
            let prec = op.precedence();
            let (left_min, right_min) = if op.is_right_associative() {
                // a^(b^c) prints without parens; (a^b)^c needs them on the left
                (prec + 1, prec)
            } else {
                (prec, prec + 1)
            };

            write_operand(lhs, left_min, out);
            out.push_str(op.symbol());
            write_operand(rhs, right_min, out);
        }

        Expr::Call { name, args } => {
            out.push_str(name);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_expr(arg, out);
            }
            out.push(')');
        }
    }
}

/// Write a subexpression, parenthesizing it when its own precedence is
/// below the minimum the context requires
fn write_operand(expr: &Expr, min_precedence: u8, out: &mut String) {
    let needs_parens = expr_precedence(expr) < min_precedence;
    if needs_parens {
        out.push('(');
    }
    write_expr(expr, out);
    if needs_parens {
        out.push(')');
    }
}

fn expr_precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Binary { op, .. } => op.precedence(),
        // Unary minus binds tighter than any binary operator but looser
        // than an atom; a negated operand of `^` still prints bare because
        // the parser gives `-2^2` the (-2)^2 reading
        Expr::Unary { .. } => UNARY_PRECEDENCE,
        _ => u8::MAX,
    }
}

fn format_number(n: f64) -> String {
    // `{}` prints the shortest representation that round-trips
    format!("{}", n)
}

fn write_sheet_prefix(sheet: &str, out: &mut String) {
    if sheet_needs_quoting(sheet) {
        out.push('\'');
        out.push_str(&sheet.replace('\'', "''"));
        out.push('\'');
    } else {
        out.push_str(sheet);
    }
    out.push('!');
}

/// A sheet name needs quoting when it could be read as something else
/// (spaces, punctuation, a leading digit, or a cell-reference shape)
fn sheet_needs_quoting(sheet: &str) -> bool {
    if sheet.is_empty() {
        return true;
    }
    if sheet.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        return true;
    }
    if !sheet
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return true;
    }
    // A name like "A1" would scan as a cell reference
    looks_like_cell_ref(sheet)
}

fn looks_like_cell_ref(text: &str) -> bool {
    let letters: String = text.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if letters.is_empty() || letters.len() == text.len() {
        return false;
    }
    let rest = &text[letters.len()..];
    rest.chars().all(|c| c.is_ascii_digit()) && CellAddress::parse(text).is_ok()
}
