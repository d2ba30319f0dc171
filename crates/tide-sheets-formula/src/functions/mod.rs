//! Built-in functions

pub mod datetime;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod text;

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::FormulaResult;
use crate::evaluator::{EvalContext, FormulaValue};

/// Function implementation signature.
///
/// Implementations receive already-evaluated arguments plus the context
/// (for the current cell, date system, and workbook access).
pub type FunctionImpl = fn(&[FormulaValue], &EvalContext) -> FormulaResult<FormulaValue>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
    /// Recalculates on every evaluation (TODAY, NOW)
    pub volatile: bool,
}

/// Function registry
pub struct FunctionRegistry {
    functions: HashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register_math();
        registry.register_logical();
        registry.register_text();
        registry.register_datetime();
        registry.register_lookup();

        registry
    }

    /// Look up a function by (case-insensitive) name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name.to_uppercase().as_str())
    }

    /// All registered function names
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }

    fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    fn register_math(&mut self) {
        self.register(FunctionDef {
            name: "SUM",
            min_args: 1,
            max_args: None,
            implementation: math::fn_sum,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "AVERAGE",
            min_args: 1,
            max_args: None,
            implementation: math::fn_average,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "MIN",
            min_args: 1,
            max_args: None,
            implementation: math::fn_min,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "MAX",
            min_args: 1,
            max_args: None,
            implementation: math::fn_max,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "COUNT",
            min_args: 1,
            max_args: None,
            implementation: math::fn_count,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "COUNTA",
            min_args: 1,
            max_args: None,
            implementation: math::fn_counta,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "ROUND",
            min_args: 1,
            max_args: Some(2),
            implementation: math::fn_round,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "INT",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_int,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "ABS",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_abs,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "SQRT",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_sqrt,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "MOD",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_mod,
            volatile: false,
        });
    }

    fn register_logical(&mut self) {
        self.register(FunctionDef {
            name: "IF",
            min_args: 2,
            max_args: Some(3),
            implementation: logical::fn_if,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "AND",
            min_args: 1,
            max_args: None,
            implementation: logical::fn_and,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "OR",
            min_args: 1,
            max_args: None,
            implementation: logical::fn_or,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "NOT",
            min_args: 1,
            max_args: Some(1),
            implementation: logical::fn_not,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "TRUE",
            min_args: 0,
            max_args: Some(0),
            implementation: logical::fn_true,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "FALSE",
            min_args: 0,
            max_args: Some(0),
            implementation: logical::fn_false,
            volatile: false,
        });
    }

    fn register_text(&mut self) {
        self.register(FunctionDef {
            name: "CONCAT",
            min_args: 1,
            max_args: None,
            implementation: text::fn_concat,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "CONCATENATE",
            min_args: 1,
            max_args: None,
            implementation: text::fn_concat,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "LEFT",
            min_args: 1,
            max_args: Some(2),
            implementation: text::fn_left,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "RIGHT",
            min_args: 1,
            max_args: Some(2),
            implementation: text::fn_right,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "MID",
            min_args: 3,
            max_args: Some(3),
            implementation: text::fn_mid,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "LEN",
            min_args: 1,
            max_args: Some(1),
            implementation: text::fn_len,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "UPPER",
            min_args: 1,
            max_args: Some(1),
            implementation: text::fn_upper,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "LOWER",
            min_args: 1,
            max_args: Some(1),
            implementation: text::fn_lower,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "TRIM",
            min_args: 1,
            max_args: Some(1),
            implementation: text::fn_trim,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "TEXT",
            min_args: 2,
            max_args: Some(2),
            implementation: text::fn_text,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "VALUE",
            min_args: 1,
            max_args: Some(1),
            implementation: text::fn_value,
            volatile: false,
        });
    }

    fn register_datetime(&mut self) {
        self.register(FunctionDef {
            name: "DATE",
            min_args: 3,
            max_args: Some(3),
            implementation: datetime::fn_date,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "TODAY",
            min_args: 0,
            max_args: Some(0),
            implementation: datetime::fn_today,
            volatile: true,
        });
        self.register(FunctionDef {
            name: "NOW",
            min_args: 0,
            max_args: Some(0),
            implementation: datetime::fn_now,
            volatile: true,
        });
        self.register(FunctionDef {
            name: "YEAR",
            min_args: 1,
            max_args: Some(1),
            implementation: datetime::fn_year,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "MONTH",
            min_args: 1,
            max_args: Some(1),
            implementation: datetime::fn_month,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "DAY",
            min_args: 1,
            max_args: Some(1),
            implementation: datetime::fn_day,
            volatile: false,
        });
    }

    fn register_lookup(&mut self) {
        self.register(FunctionDef {
            name: "VLOOKUP",
            min_args: 3,
            max_args: Some(4),
            implementation: lookup::fn_vlookup,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "INDEX",
            min_args: 2,
            max_args: Some(3),
            implementation: lookup::fn_index,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "MATCH",
            min_args: 2,
            max_args: Some(3),
            implementation: lookup::fn_match,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "ROW",
            min_args: 0,
            max_args: Some(0),
            implementation: lookup::fn_row,
            volatile: false,
        });
        self.register(FunctionDef {
            name: "COLUMN",
            min_args: 0,
            max_args: Some(0),
            implementation: lookup::fn_column,
            volatile: false,
        });
    }
}

/// Global function registry (lazily initialized)
static REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// The global function registry
pub fn registry() -> &'static FunctionRegistry {
    REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Registry names within Levenshtein distance 2 of `name`, closest first
pub fn suggestions_for(name: &str) -> Vec<String> {
    let upper = name.to_uppercase();
    let mut candidates: Vec<(usize, &str)> = registry()
        .names()
        .filter_map(|candidate| {
            let distance = levenshtein(&upper, candidate);
            (distance <= 2).then_some((distance, candidate))
        })
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    candidates
        .into_iter()
        .take(3)
        .map(|(_, name)| name.to_string())
        .collect()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        assert!(registry().get("SUM").is_some());
        assert!(registry().get("sum").is_some()); // case-insensitive
        assert!(registry().get("NOPE").is_none());
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("SUM", "SUM"), 0);
        assert_eq!(levenshtein("SUMM", "SUM"), 1);
        assert_eq!(levenshtein("AVG", "ABS"), 2);
        assert_eq!(levenshtein("", "ABC"), 3);
    }

    #[test]
    fn test_suggestions() {
        let suggestions = suggestions_for("SUMM");
        assert!(suggestions.contains(&"SUM".to_string()));

        let suggestions = suggestions_for("COUNTT");
        assert!(suggestions.contains(&"COUNT".to_string()));

        assert!(suggestions_for("ZZZZZZZZ").is_empty());
    }

    #[test]
    fn test_volatile_flags() {
        assert!(registry().get("NOW").unwrap().volatile);
        assert!(registry().get("TODAY").unwrap().volatile);
        assert!(!registry().get("SUM").unwrap().volatile);
    }
}
