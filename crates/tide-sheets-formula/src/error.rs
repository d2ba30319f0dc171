//! Formula error types

use thiserror::Error;
use tide_sheets_core::{CellAddress, CellError};

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Parse failure subkinds
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    /// The formula body is empty
    #[error("empty formula")]
    EmptyInput,

    /// An unexpected token was found
    #[error("unexpected token '{found}' at position {position}")]
    UnexpectedToken { found: String, position: usize },

    /// Parentheses do not balance
    #[error("unbalanced parentheses")]
    UnbalancedParens,

    /// A malformed cell or range reference
    #[error("invalid reference '{input}' at position {position}")]
    InvalidRef { input: String, position: usize },

    /// A call to a function not in the registry
    #[error("unknown function '{name}' at position {position}{}", format_suggestions(.suggestions))]
    UnknownFunction {
        name: String,
        position: usize,
        suggestions: Vec<String>,
    },
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", suggestions.join(", "))
    }
}

/// Errors that can occur during formula parsing or evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("parse error: {0}")]
    Parse(ParseErrorKind),

    /// A cycle among formula cells; the path lists the cells involved
    #[error("circular reference: {}", format_cycle(.0))]
    CircularReference(Vec<CellAddress>),

    /// Evaluation produced an error value at the top level
    #[error("evaluation error: {0}")]
    Evaluation(CellError),

    /// Reference to a missing sheet or invalid cell
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Wrong number of arguments
    #[error("wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },
}

fn format_cycle(path: &[CellAddress]) -> String {
    path.iter()
        .map(|a| a.to_a1_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl From<ParseErrorKind> for FormulaError {
    fn from(kind: ParseErrorKind) -> Self {
        FormulaError::Parse(kind)
    }
}
