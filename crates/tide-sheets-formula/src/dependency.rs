//! Formula dependency graph
//!
//! Built over a single sheet. The graph is arena-backed: nodes live in a
//! vector and edges are index lists, so ownership stays trivial. Nodes are
//! every formula cell plus every cell a formula references; an edge
//! `u -> v` means "cell v's formula reads cell u".

use ahash::{AHashMap, AHashSet};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::ast::Expr;
use crate::error::{FormulaError, FormulaResult};
use crate::parser::parse_formula;
use tide_sheets_core::{CellAddress, Worksheet};

/// A cell position within the analyzed sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub row: u32,
    pub col: u16,
}

impl CellKey {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    pub fn from_address(addr: &CellAddress) -> Self {
        Self::new(addr.row, addr.col)
    }

    pub fn to_address(self) -> CellAddress {
        CellAddress::new(self.row, self.col)
    }

    fn packed(self) -> u64 {
        ((self.row as u64) << 16) | self.col as u64
    }
}

/// Dependency graph over one sheet's formulas
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Node arena
    nodes: Vec<CellKey>,
    /// Whether the node holds a formula
    is_formula: Vec<bool>,
    /// Packed key → node index
    index: AHashMap<u64, usize>,
    /// precedent → dependents
    dependents: Vec<Vec<usize>>,
    /// dependent → precedents
    precedents: Vec<Vec<usize>>,
    /// Parsed formula per formula node
    asts: AHashMap<u64, Expr>,
}

impl DependencyGraph {
    /// Build the graph for a sheet.
    ///
    /// Cells whose formulas fail to parse get no edges; evaluating them
    /// later reports the error. Qualified references to other sheets and
    /// the foreign legs of 3-D spans contribute nothing here.
    pub fn build(sheet: &Worksheet) -> Self {
        let mut graph = Self::default();

        let formulas: Vec<(CellKey, &str)> = sheet
            .formula_cells()
            .map(|(row, col, text)| (CellKey::new(row, col), text))
            .collect();

        for (key, _) in &formulas {
            let idx = graph.intern(*key);
            graph.is_formula[idx] = true;
        }

        for (key, text) in formulas {
            let ast = match parse_formula(text) {
                Ok(ast) => ast,
                Err(_) => continue,
            };

            let mut refs = AHashSet::new();
            collect_precedents(&ast, sheet, &mut refs);

            let dependent_idx = graph.intern(key);
            for precedent in refs {
                if precedent == key {
                    // Direct self-loop
                    graph.add_edge(dependent_idx, dependent_idx);
                    continue;
                }
                let precedent_idx = graph.intern(precedent);
                graph.add_edge(precedent_idx, dependent_idx);
            }

            graph.asts.insert(key.packed(), ast);
        }

        graph
    }

    fn intern(&mut self, key: CellKey) -> usize {
        if let Some(&idx) = self.index.get(&key.packed()) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(key);
        self.is_formula.push(false);
        self.dependents.push(Vec::new());
        self.precedents.push(Vec::new());
        self.index.insert(key.packed(), idx);
        idx
    }

    fn add_edge(&mut self, precedent: usize, dependent: usize) {
        if !self.dependents[precedent].contains(&dependent) {
            self.dependents[precedent].push(dependent);
            self.precedents[dependent].push(precedent);
        }
    }

    /// Number of formula cells in the graph
    pub fn formula_count(&self) -> usize {
        self.is_formula.iter().filter(|&&f| f).count()
    }

    /// The parsed formula for a cell, if it parsed
    pub fn ast(&self, key: CellKey) -> Option<&Expr> {
        self.asts.get(&key.packed())
    }

    /// Direct precedents of a cell: the cells its formula reads
    pub fn precedents(&self, key: CellKey) -> Vec<CellKey> {
        let mut out: Vec<CellKey> = match self.index.get(&key.packed()) {
            Some(&idx) => self.precedents[idx].iter().map(|&i| self.nodes[i]).collect(),
            None => Vec::new(),
        };
        out.sort();
        out
    }

    /// Direct dependents of a cell: the formulas that read it
    pub fn dependents(&self, key: CellKey) -> Vec<CellKey> {
        let mut out: Vec<CellKey> = match self.index.get(&key.packed()) {
            Some(&idx) => self.dependents[idx].iter().map(|&i| self.nodes[i]).collect(),
            None => Vec::new(),
        };
        out.sort();
        out
    }

    /// All cells transitively affected by a change to `key` (impact set)
    pub fn transitive_dependents(&self, key: CellKey) -> Vec<CellKey> {
        let start = match self.index.get(&key.packed()) {
            Some(&idx) => idx,
            None => return Vec::new(),
        };

        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![start];
        let mut out = Vec::new();

        while let Some(node) = stack.pop() {
            for &dep in &self.dependents[node] {
                if !seen[dep] {
                    seen[dep] = true;
                    out.push(self.nodes[dep]);
                    stack.push(dep);
                }
            }
        }

        out.sort();
        out
    }

    /// Detect reference cycles with Tarjan's SCC algorithm.
    ///
    /// Every strongly connected component of size >= 2 is a cycle, plus
    /// any direct self-loop. Each cycle path is sorted by (row, col).
    pub fn detect_cycles(&self) -> Vec<Vec<CellKey>> {
        let mut state = TarjanState {
            graph: self,
            index_counter: 0,
            indices: vec![None; self.nodes.len()],
            lowlink: vec![0; self.nodes.len()],
            on_stack: vec![false; self.nodes.len()],
            stack: Vec::new(),
            cycles: Vec::new(),
        };

        for node in 0..self.nodes.len() {
            if state.indices[node].is_none() {
                state.strongconnect(node);
            }
        }

        let mut cycles = state.cycles;
        for cycle in &mut cycles {
            cycle.sort();
        }
        cycles.sort();
        cycles
    }

    /// Order formula cells so every cell follows its precedents (Kahn's
    /// algorithm with a deterministic (row, col) tie-break).
    ///
    /// Fails with [`FormulaError::CircularReference`] when a cycle
    /// prevents placing every formula cell.
    pub fn topological_sort(&self) -> FormulaResult<Vec<CellKey>> {
        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        for node in 0..n {
            for &dep in &self.dependents[node] {
                in_degree[dep] += 1;
            }
        }

        // Min-heap keyed by (row, col) for a stable order
        let mut ready: BinaryHeap<Reverse<(CellKey, usize)>> = BinaryHeap::new();
        for node in 0..n {
            if in_degree[node] == 0 {
                ready.push(Reverse((self.nodes[node], node)));
            }
        }

        let mut order = Vec::with_capacity(n);
        let mut placed = 0usize;

        while let Some(Reverse((key, node))) = ready.pop() {
            placed += 1;
            if self.is_formula[node] {
                order.push(key);
            }
            for &dep in &self.dependents[node] {
                in_degree[dep] -= 1;
                if in_degree[dep] == 0 {
                    ready.push(Reverse((self.nodes[dep], dep)));
                }
            }
        }

        if placed != n {
            let cycles = self.detect_cycles();
            let path = cycles
                .into_iter()
                .next()
                .unwrap_or_default()
                .into_iter()
                .map(CellKey::to_address)
                .collect();
            return Err(FormulaError::CircularReference(path));
        }

        Ok(order)
    }
}

struct TarjanState<'a> {
    graph: &'a DependencyGraph,
    index_counter: usize,
    indices: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    cycles: Vec<Vec<CellKey>>,
}

impl TarjanState<'_> {
    fn strongconnect(&mut self, v: usize) {
        self.indices[v] = Some(self.index_counter);
        self.lowlink[v] = self.index_counter;
        self.index_counter += 1;
        self.stack.push(v);
        self.on_stack[v] = true;

        for i in 0..self.graph.dependents[v].len() {
            let w = self.graph.dependents[v][i];
            match self.indices[w] {
                None => {
                    self.strongconnect(w);
                    self.lowlink[v] = self.lowlink[v].min(self.lowlink[w]);
                }
                Some(w_index) => {
                    if self.on_stack[w] {
                        self.lowlink[v] = self.lowlink[v].min(w_index);
                    }
                }
            }
        }

        if self.lowlink[v] == self.indices[v].unwrap() {
            let mut component = Vec::new();
            loop {
                let w = self.stack.pop().unwrap();
                self.on_stack[w] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }

            let is_self_loop =
                component.len() == 1 && self.graph.dependents[component[0]].contains(&component[0]);

            if component.len() >= 2 || is_self_loop {
                self.cycles
                    .push(component.iter().map(|&i| self.graph.nodes[i]).collect());
            }
        }
    }
}

/// Walk an expression, collecting the cells it reads on this sheet.
///
/// Range references contribute the cells that exist in the sheet (sparse
/// storage makes the full rectangle wasteful); direct references count
/// even when the cell is empty. A 3-D span contributes its address only
/// when an endpoint names the analyzed sheet.
fn collect_precedents(expr: &Expr, sheet: &Worksheet, out: &mut AHashSet<CellKey>) {
    match expr {
        Expr::Number(_) | Expr::Text(_) | Expr::Bool(_) | Expr::Error(_) => {}

        Expr::Ref(cell_ref) => {
            if on_this_sheet(cell_ref.sheet.as_deref(), sheet) {
                out.insert(CellKey::from_address(&cell_ref.address));
            }
        }

        Expr::Range(range_ref) => {
            if on_this_sheet(range_ref.sheet.as_deref(), sheet) {
                for (row, col, _) in sheet.iter_cells_in_range(&range_ref.range) {
                    out.insert(CellKey::new(row, col));
                }
            }
        }

        Expr::SheetSpan(span) => {
            if span.first_sheet == sheet.name() || span.last_sheet == sheet.name() {
                out.insert(CellKey::from_address(&span.address));
            }
        }

        Expr::Unary { operand, .. } => collect_precedents(operand, sheet, out),

        Expr::Binary { lhs, rhs, .. } => {
            collect_precedents(lhs, sheet, out);
            collect_precedents(rhs, sheet, out);
        }

        Expr::Call { args, .. } => {
            for arg in args {
                collect_precedents(arg, sheet, out);
            }
        }
    }
}

fn on_this_sheet(qualifier: Option<&str>, sheet: &Worksheet) -> bool {
    match qualifier {
        None => true,
        Some(name) => name == sheet.name(),
    }
}
