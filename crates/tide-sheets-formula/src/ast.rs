//! Formula abstract syntax tree

use tide_sheets_core::{CellAddress, CellError, CellRange};

/// Formula expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal
    Text(String),
    /// Boolean literal
    Bool(bool),
    /// Error literal
    Error(CellError),

    // === References ===
    /// Single cell reference, optionally sheet-qualified
    Ref(CellRef),
    /// Range reference, optionally sheet-qualified
    Range(RangeRef),
    /// 3-D reference spanning a run of sheets (`Sheet1:Sheet4!A1`)
    SheetSpan(SheetSpanRef),

    // === Operators ===
    /// Unary operation
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Binary operation
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    // === Function call ===
    Call { name: String, args: Vec<Expr> },
}

/// Cell reference with optional sheet qualifier.
///
/// Absolute anchors (`$`) survive parsing on the address so the shifter
/// can honor them.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRef {
    pub sheet: Option<String>,
    pub address: CellAddress,
}

/// Range reference with optional sheet qualifier
#[derive(Debug, Clone, PartialEq)]
pub struct RangeRef {
    pub sheet: Option<String>,
    pub range: CellRange,
}

/// 3-D reference: the same cell across a span of sheets
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSpanRef {
    pub first_sheet: String,
    pub last_sheet: String,
    pub address: CellAddress,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Prefix `+` (no-op, but preserved for printing fidelity)
    Plus,
    /// Prefix `-`
    Negate,
    /// Postfix `%`
    Percent,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Text
    Concat,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl BinaryOp {
    /// Operator precedence, low to high
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::LessThan
            | BinaryOp::LessEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterEqual => 1,
            BinaryOp::Concat => 2,
            BinaryOp::Add | BinaryOp::Subtract => 3,
            BinaryOp::Multiply | BinaryOp::Divide => 4,
            BinaryOp::Power => 5,
        }
    }

    /// Whether the operator is right-associative
    pub fn is_right_associative(&self) -> bool {
        matches!(self, BinaryOp::Power)
    }

    /// Source symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Power => "^",
            BinaryOp::Concat => "&",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "<>",
            BinaryOp::LessThan => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterEqual => ">=",
        }
    }
}

impl Expr {
    /// Build a plain (unqualified) cell reference expression
    pub fn cell(address: CellAddress) -> Expr {
        Expr::Ref(CellRef {
            sheet: None,
            address,
        })
    }

    /// Build a plain (unqualified) range reference expression
    pub fn range(range: CellRange) -> Expr {
        Expr::Range(RangeRef { sheet: None, range })
    }
}
