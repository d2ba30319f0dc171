//! Formula evaluator
//!
//! Evaluates formula trees against a sheet (and optionally a workbook for
//! cross-sheet references). Error values participate in evaluation and
//! propagate; only structural problems (bad arity, cycles) surface as
//! `Err`.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;

use ahash::{AHashMap, AHashSet};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::dependency::{CellKey, DependencyGraph};
use crate::error::{FormulaError, FormulaResult, ParseErrorKind};
use crate::functions;
use crate::parser::parse_formula;
use tide_sheets_core::serial::datetime_to_serial;
use tide_sheets_core::{CellAddress, CellError, CellValue, Workbook, Worksheet};

/// Value domain during evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Error(CellError),
    Array(Vec<Vec<FormulaValue>>),
    Empty,
}

impl FormulaValue {
    /// Coerce to a number where the coercion rules allow it:
    /// booleans become 0/1, numeric text parses, blanks are 0.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Bool(true) => Some(1.0),
            FormulaValue::Bool(false) => Some(0.0),
            FormulaValue::Text(s) => s.trim().parse().ok(),
            FormulaValue::Empty => Some(0.0),
            _ => None,
        }
    }

    /// Numeric coercion; failure is the `#VALUE!` error
    pub fn coerce_number(&self) -> Result<f64, CellError> {
        if let FormulaValue::Error(e) = self {
            return Err(*e);
        }
        self.as_number().ok_or(CellError::Value)
    }

    /// Boolean coercion
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormulaValue::Bool(b) => Some(*b),
            FormulaValue::Number(n) => Some(*n != 0.0),
            FormulaValue::Empty => Some(false),
            FormulaValue::Text(s) => {
                let upper = s.to_uppercase();
                if upper == "TRUE" {
                    Some(true)
                } else if upper == "FALSE" {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Boolean coercion; failure is the `#VALUE!` error
    pub fn coerce_bool(&self) -> Result<bool, CellError> {
        if let FormulaValue::Error(e) = self {
            return Err(*e);
        }
        self.as_bool().ok_or(CellError::Value)
    }

    /// Text rendering: blanks are "", numbers print plainly
    pub fn as_text(&self) -> String {
        match self {
            FormulaValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            FormulaValue::Text(s) => s.clone(),
            FormulaValue::Bool(true) => "TRUE".to_string(),
            FormulaValue::Bool(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) => CellError::Value.to_string(),
        }
    }

    /// Check if this is an error value
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    /// Get the error if this is one
    pub fn get_error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Convert into a storable cell value
    pub fn into_cell_value(self) -> CellValue {
        match self {
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::Text(s) => CellValue::text(s),
            FormulaValue::Bool(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
            FormulaValue::Array(rows) => {
                // Single-element arrays collapse; anything larger has no
                // scalar cell representation
                match rows.first().and_then(|r| r.first()) {
                    Some(v) if rows.len() == 1 && rows[0].len() == 1 => {
                        v.clone().into_cell_value()
                    }
                    _ => CellValue::Error(CellError::Value),
                }
            }
        }
    }
}

fn packed(row: u32, col: u16) -> u64 {
    ((row as u64) << 16) | col as u64
}

/// Context for formula evaluation
pub struct EvalContext<'a> {
    /// The sheet the formula lives on
    sheet: &'a Worksheet,
    /// Workbook for cross-sheet and 3-D references
    workbook: Option<&'a Workbook>,
    /// Date system for serial conversion
    date_1904: bool,
    /// Cell being evaluated (for ROW()/COLUMN() and recursion)
    current: Cell<(u32, u16)>,
    /// Substituted cell values; non-empty overrides force dependent
    /// formulas to re-evaluate instead of trusting cached results
    overrides: AHashMap<u64, CellValue>,
    /// Fresh results computed during this evaluation
    shadow: RefCell<AHashMap<u64, FormulaValue>>,
    /// Recursion guard for formula-to-formula references
    visiting: RefCell<AHashSet<u64>>,
}

impl<'a> EvalContext<'a> {
    /// Create a context for a standalone sheet
    pub fn for_sheet(sheet: &'a Worksheet) -> Self {
        Self {
            sheet,
            workbook: None,
            date_1904: false,
            current: Cell::new((0, 0)),
            overrides: AHashMap::new(),
            shadow: RefCell::new(AHashMap::new()),
            visiting: RefCell::new(AHashSet::new()),
        }
    }

    /// Create a context for a sheet within a workbook
    pub fn for_workbook(workbook: &'a Workbook, sheet_index: usize) -> FormulaResult<Self> {
        let sheet = workbook.sheet(sheet_index).ok_or_else(|| {
            FormulaError::InvalidReference(format!("no sheet at index {}", sheet_index))
        })?;
        Ok(Self {
            sheet,
            workbook: Some(workbook),
            date_1904: workbook.settings().date_1904,
            current: Cell::new((0, 0)),
            overrides: AHashMap::new(),
            shadow: RefCell::new(AHashMap::new()),
            visiting: RefCell::new(AHashSet::new()),
        })
    }

    /// Substitute values for cells during this evaluation (and any
    /// transitively dependent formula evaluation)
    pub fn with_overrides<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (CellAddress, CellValue)>,
    {
        for (addr, value) in overrides {
            self.overrides.insert(packed(addr.row, addr.col), value);
        }
        self
    }

    /// Position the context at the cell being evaluated
    pub fn set_current(&self, row: u32, col: u16) {
        self.current.set((row, col));
    }

    /// Row of the cell being evaluated
    pub fn current_row(&self) -> u32 {
        self.current.get().0
    }

    /// Column of the cell being evaluated
    pub fn current_col(&self) -> u16 {
        self.current.get().1
    }

    /// The date system in effect
    pub fn date_1904(&self) -> bool {
        self.date_1904
    }

    fn store_shadow(&self, key: u64, value: FormulaValue) {
        self.shadow.borrow_mut().insert(key, value);
    }

    /// Convert a stored cell value into the evaluation domain
    pub fn cell_to_value(&self, value: &CellValue) -> FormulaValue {
        match value.effective_value() {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(*n),
            CellValue::Boolean(b) => FormulaValue::Bool(*b),
            CellValue::Text(s) => FormulaValue::Text(s.as_str().to_string()),
            CellValue::DateTime(dt) => {
                FormulaValue::Number(datetime_to_serial(*dt, self.date_1904))
            }
            CellValue::Error(e) => FormulaValue::Error(*e),
            rich @ CellValue::RichText(_) => {
                FormulaValue::Text(rich.plain_text().unwrap_or_default())
            }
            // A formula with no cached value reaching here means the
            // recursive path declined to evaluate it
            CellValue::Formula { .. } => FormulaValue::Empty,
        }
    }

    fn other_sheet(&self, name: &str) -> Option<&'a Worksheet> {
        self.workbook.and_then(|wb| wb.sheet_by_name(name))
    }

    /// Fetch one cell's value, honoring overrides, fresh results, and
    /// cached formula results
    pub fn get_cell_value(&self, sheet_name: Option<&str>, row: u32, col: u16) -> FormulaValue {
        match sheet_name {
            Some(name) if name != self.sheet.name() => match self.other_sheet(name) {
                Some(sheet) => self.cell_to_value(&sheet.value_at(row, col)),
                None => FormulaValue::Error(CellError::Ref),
            },
            _ => self.get_local_cell_value(row, col),
        }
    }

    fn get_local_cell_value(&self, row: u32, col: u16) -> FormulaValue {
        let key = packed(row, col);

        if let Some(value) = self.overrides.get(&key) {
            return self.cell_to_value(value);
        }
        if let Some(value) = self.shadow.borrow().get(&key) {
            return value.clone();
        }

        let cell_value = match self.sheet.cell_at(row, col) {
            Some(cell) => cell.value.clone(),
            None => return FormulaValue::Empty,
        };

        match &cell_value {
            CellValue::Formula { text, cached_value } => {
                // Cached results are trusted unless overrides are in play
                // or no result was ever cached
                if self.overrides.is_empty() {
                    if let Some(cached) = cached_value {
                        return self.cell_to_value(cached);
                    }
                }
                self.evaluate_referenced_formula(key, row, col, text)
            }
            other => self.cell_to_value(other),
        }
    }

    fn evaluate_referenced_formula(
        &self,
        key: u64,
        row: u32,
        col: u16,
        text: &str,
    ) -> FormulaValue {
        if !self.visiting.borrow_mut().insert(key) {
            // Re-entered a cell already on the evaluation path
            return FormulaValue::Error(CellError::Ref);
        }

        let result = match parse_formula(text) {
            Ok(ast) => {
                let saved = self.current.get();
                self.current.set((row, col));
                let value = evaluate(&ast, self)
                    .unwrap_or(FormulaValue::Error(CellError::Value));
                self.current.set(saved);
                value
            }
            Err(FormulaError::Parse(ParseErrorKind::UnknownFunction { .. })) => {
                FormulaValue::Error(CellError::Name)
            }
            Err(_) => FormulaValue::Error(CellError::Value),
        };

        self.visiting.borrow_mut().remove(&key);
        self.store_shadow(key, result.clone());
        result
    }

    /// Fetch a rectangular range as an array.
    ///
    /// Very large ranges are clamped to the sheet's used bounds; the cells
    /// beyond them are all empty anyway.
    pub fn get_range_values(
        &self,
        sheet_name: Option<&str>,
        range: &tide_sheets_core::CellRange,
    ) -> FormulaValue {
        const FULL_SCAN_LIMIT: u64 = 65_536;

        let target_sheet = match sheet_name {
            Some(name) if name != self.sheet.name() => match self.other_sheet(name) {
                Some(sheet) => sheet,
                None => return FormulaValue::Error(CellError::Ref),
            },
            _ => self.sheet,
        };

        let (end_row, end_col) = if range.cell_count() > FULL_SCAN_LIMIT {
            match target_sheet.used_range() {
                Some(used) => (
                    range.end.row.min(used.end.row),
                    range.end.col.min(used.end.col),
                ),
                None => return FormulaValue::Array(Vec::new()),
            }
        } else {
            (range.end.row, range.end.col)
        };

        let local = std::ptr::eq(target_sheet, self.sheet);
        let mut rows = Vec::new();
        for row in range.start.row..=end_row {
            let mut cols = Vec::new();
            for col in range.start.col..=end_col {
                let value = if local {
                    self.get_local_cell_value(row, col)
                } else {
                    self.cell_to_value(&target_sheet.value_at(row, col))
                };
                cols.push(value);
            }
            rows.push(cols);
        }

        FormulaValue::Array(rows)
    }

    /// Fetch the same cell across a run of sheets (3-D reference)
    fn get_span_values(
        &self,
        first_sheet: &str,
        last_sheet: &str,
        row: u32,
        col: u16,
    ) -> FormulaValue {
        let workbook = match self.workbook {
            Some(wb) => wb,
            None => return FormulaValue::Error(CellError::Ref),
        };

        let first = workbook.sheet_index(first_sheet);
        let last = workbook.sheet_index(last_sheet);
        let (first, last) = match (first, last) {
            (Some(a), Some(b)) => (a.min(b), a.max(b)),
            _ => return FormulaValue::Error(CellError::Ref),
        };

        let mut rows = Vec::new();
        for idx in first..=last {
            let sheet = match workbook.sheet(idx) {
                Some(s) => s,
                None => return FormulaValue::Error(CellError::Ref),
            };
            let value = if std::ptr::eq(sheet, self.sheet) {
                self.get_local_cell_value(row, col)
            } else {
                self.cell_to_value(&sheet.value_at(row, col))
            };
            rows.push(vec![value]);
        }

        FormulaValue::Array(rows)
    }
}

/// Evaluate a formula expression in a context
pub fn evaluate(expr: &Expr, ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    match expr {
        Expr::Number(n) => Ok(FormulaValue::Number(*n)),
        Expr::Text(s) => Ok(FormulaValue::Text(s.clone())),
        Expr::Bool(b) => Ok(FormulaValue::Bool(*b)),
        Expr::Error(e) => Ok(FormulaValue::Error(*e)),

        Expr::Ref(cell_ref) => Ok(ctx.get_cell_value(
            cell_ref.sheet.as_deref(),
            cell_ref.address.row,
            cell_ref.address.col,
        )),

        Expr::Range(range_ref) => {
            Ok(ctx.get_range_values(range_ref.sheet.as_deref(), &range_ref.range))
        }

        Expr::SheetSpan(span) => Ok(ctx.get_span_values(
            &span.first_sheet,
            &span.last_sheet,
            span.address.row,
            span.address.col,
        )),

        Expr::Unary { op, operand } => evaluate_unary(*op, operand, ctx),

        Expr::Binary { op, lhs, rhs } => evaluate_binary(*op, lhs, rhs, ctx),

        Expr::Call { name, args } => evaluate_call(name, args, ctx),
    }
}

fn evaluate_unary(op: UnaryOp, operand: &Expr, ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    let value = evaluate(operand, ctx)?;
    if let Some(e) = value.get_error() {
        return Ok(FormulaValue::Error(e));
    }

    match op {
        UnaryOp::Plus => Ok(value),
        UnaryOp::Negate => Ok(match value.coerce_number() {
            Ok(n) => FormulaValue::Number(-n),
            Err(e) => FormulaValue::Error(e),
        }),
        UnaryOp::Percent => Ok(match value.coerce_number() {
            Ok(n) => FormulaValue::Number(n / 100.0),
            Err(e) => FormulaValue::Error(e),
        }),
    }
}

fn evaluate_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &EvalContext,
) -> FormulaResult<FormulaValue> {
    let left = evaluate(lhs, ctx)?;
    let right = evaluate(rhs, ctx)?;

    // Errors short-circuit
    if let Some(e) = left.get_error() {
        return Ok(FormulaValue::Error(e));
    }
    if let Some(e) = right.get_error() {
        return Ok(FormulaValue::Error(e));
    }

    let arith = |f: fn(f64, f64) -> FormulaValue| -> FormulaValue {
        match (left.coerce_number(), right.coerce_number()) {
            (Ok(l), Ok(r)) => f(l, r),
            (Err(e), _) | (_, Err(e)) => FormulaValue::Error(e),
        }
    };

    Ok(match op {
        BinaryOp::Add => arith(|l, r| FormulaValue::Number(l + r)),
        BinaryOp::Subtract => arith(|l, r| FormulaValue::Number(l - r)),
        BinaryOp::Multiply => arith(|l, r| FormulaValue::Number(l * r)),
        BinaryOp::Divide => arith(|l, r| {
            if r == 0.0 {
                FormulaValue::Error(CellError::Div0)
            } else {
                FormulaValue::Number(l / r)
            }
        }),
        BinaryOp::Power => arith(|l, r| {
            let result = l.powf(r);
            if result.is_nan() || result.is_infinite() {
                FormulaValue::Error(CellError::Num)
            } else {
                FormulaValue::Number(result)
            }
        }),

        BinaryOp::Concat => FormulaValue::Text(format!("{}{}", left.as_text(), right.as_text())),

        BinaryOp::Equal => FormulaValue::Bool(compare_values(&left, &right) == Ordering::Equal),
        BinaryOp::NotEqual => FormulaValue::Bool(compare_values(&left, &right) != Ordering::Equal),
        BinaryOp::LessThan => FormulaValue::Bool(compare_values(&left, &right) == Ordering::Less),
        BinaryOp::LessEqual => {
            FormulaValue::Bool(compare_values(&left, &right) != Ordering::Greater)
        }
        BinaryOp::GreaterThan => {
            FormulaValue::Bool(compare_values(&left, &right) == Ordering::Greater)
        }
        BinaryOp::GreaterEqual => {
            FormulaValue::Bool(compare_values(&left, &right) != Ordering::Less)
        }
    })
}

/// Excel comparison: numbers < text < booleans; text comparison is
/// case-insensitive; blanks coerce to the zero of the other side's type
pub fn compare_values(left: &FormulaValue, right: &FormulaValue) -> Ordering {
    fn rank(v: &FormulaValue) -> u8 {
        match v {
            FormulaValue::Number(_) => 0,
            FormulaValue::Text(_) => 1,
            FormulaValue::Bool(_) => 2,
            _ => 0,
        }
    }

    use FormulaValue::*;
    match (left, right) {
        (Empty, Empty) => Ordering::Equal,
        (Empty, Number(n)) => 0.0f64.partial_cmp(n).unwrap_or(Ordering::Equal),
        (Number(n), Empty) => n.partial_cmp(&0.0).unwrap_or(Ordering::Equal),
        (Empty, Text(s)) => {
            if s.is_empty() {
                Ordering::Equal
            } else {
                Ordering::Less
            }
        }
        (Text(s), Empty) => {
            if s.is_empty() {
                Ordering::Equal
            } else {
                Ordering::Greater
            }
        }
        (Empty, Bool(b)) => false.cmp(b),
        (Bool(b), Empty) => b.cmp(&false),

        (Number(l), Number(r)) => l.partial_cmp(r).unwrap_or(Ordering::Equal),
        (Text(l), Text(r)) => l.to_lowercase().cmp(&r.to_lowercase()),
        (Bool(l), Bool(r)) => l.cmp(r),

        (l, r) => rank(l).cmp(&rank(r)),
    }
}

fn evaluate_call(name: &str, args: &[Expr], ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    // IF is lazy: only the chosen branch is evaluated, so an error in the
    // untaken branch cannot leak into the result
    if name == "IF" {
        return evaluate_if(args, ctx);
    }

    let def = match functions::registry().get(name) {
        Some(def) => def,
        None => return Ok(FormulaValue::Error(CellError::Name)),
    };

    check_arity(def, args.len())?;

    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(evaluate(arg, ctx)?);
    }

    (def.implementation)(&values, ctx)
}

fn evaluate_if(args: &[Expr], ctx: &EvalContext) -> FormulaResult<FormulaValue> {
    if args.len() < 2 || args.len() > 3 {
        return Err(FormulaError::ArgumentCount {
            function: "IF".into(),
            expected: "2..3".into(),
            actual: args.len(),
        });
    }

    let condition = evaluate(&args[0], ctx)?;
    let test = match condition.coerce_bool() {
        Ok(b) => b,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };

    if test {
        evaluate(&args[1], ctx)
    } else if let Some(otherwise) = args.get(2) {
        evaluate(otherwise, ctx)
    } else {
        Ok(FormulaValue::Bool(false))
    }
}

fn check_arity(def: &functions::FunctionDef, actual: usize) -> FormulaResult<()> {
    let ok = actual >= def.min_args && def.max_args.map_or(true, |max| actual <= max);
    if ok {
        return Ok(());
    }

    let expected = match def.max_args {
        Some(max) if max == def.min_args => format!("{}", max),
        Some(max) => format!("{}..{}", def.min_args, max),
        None => format!("{}+", def.min_args),
    };

    Err(FormulaError::ArgumentCount {
        function: def.name.to_string(),
        expected,
        actual,
    })
}

/// Evaluate a formula string against a sheet
pub fn evaluate_formula(
    sheet: &Worksheet,
    formula: &str,
    overrides: &[(CellAddress, CellValue)],
) -> FormulaResult<CellValue> {
    let ast = parse_formula(formula)?;
    let ctx = EvalContext::for_sheet(sheet).with_overrides(overrides.iter().cloned());
    Ok(evaluate(&ast, &ctx)?.into_cell_value())
}

/// Evaluate the formula stored in a cell; a plain value cell evaluates to
/// itself
pub fn evaluate_cell(
    sheet: &Worksheet,
    address: &str,
    overrides: &[(CellAddress, CellValue)],
) -> FormulaResult<CellValue> {
    let addr = CellAddress::parse(address)
        .map_err(|e| FormulaError::InvalidReference(e.to_string()))?;

    let ctx = EvalContext::for_sheet(sheet).with_overrides(overrides.iter().cloned());
    ctx.set_current(addr.row, addr.col);

    match sheet.formula_at(addr.row, addr.col) {
        Some(text) => match parse_formula(text) {
            Ok(ast) => Ok(evaluate(&ast, &ctx)?.into_cell_value()),
            // A stored formula naming an unknown function evaluates to
            // #NAME? rather than failing the call
            Err(FormulaError::Parse(ParseErrorKind::UnknownFunction { .. })) => {
                Ok(CellValue::Error(CellError::Name))
            }
            Err(e) => Err(e),
        },
        None => Ok(sheet.value_at(addr.row, addr.col)),
    }
}

/// Dependency-checked evaluation of every formula cell on a sheet.
///
/// 1. Build the dependency graph.
/// 2. Detect cycles; any cycle aborts with its path.
/// 3. Topologically sort the formula cells.
/// 4. Evaluate in order, feeding each result into a shadow map so
///    downstream formulas see fresh values rather than stale caches.
///
/// Overrides apply before evaluation and participate in propagation.
/// Results come back in evaluation order.
pub fn evaluate_with_dependency_check(
    sheet: &Worksheet,
    overrides: &[(CellAddress, CellValue)],
) -> FormulaResult<Vec<(CellKey, CellValue)>> {
    let graph = DependencyGraph::build(sheet);

    let cycles = graph.detect_cycles();
    if let Some(cycle) = cycles.into_iter().next() {
        return Err(FormulaError::CircularReference(
            cycle.into_iter().map(CellKey::to_address).collect(),
        ));
    }

    let order = graph.topological_sort()?;

    let ctx = EvalContext::for_sheet(sheet).with_overrides(overrides.iter().cloned());
    let mut results = Vec::with_capacity(order.len());

    for key in order {
        ctx.set_current(key.row, key.col);
        let value = match graph.ast(key) {
            Some(ast) => evaluate(ast, &ctx).unwrap_or(FormulaValue::Error(CellError::Value)),
            // The formula failed to parse during graph construction
            None => FormulaValue::Error(CellError::Value),
        };
        ctx.store_shadow(packed(key.row, key.col), value.clone());
        results.push((key, value.into_cell_value()));
    }

    Ok(results)
}
