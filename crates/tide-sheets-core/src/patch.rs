//! First-class sheet edits
//!
//! A [`Patch`] is a value describing an edit to a worksheet. Patches
//! compose with [`Patch::then`], forming a monoid: composition is
//! associative, [`Patch::empty`] is the identity on both sides, and
//! `p.then(q)` applied to a sheet is equivalent to applying `p` then `q`.
//!
//! [`Worksheet::apply`] is the single evaluator: it flattens the patch and
//! applies the operations in one pass over a cloned sheet, so application
//! is all-or-nothing at the sheet level.

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::comment::CellComment;
use crate::error::{Error, Result};
use crate::sheet::Worksheet;
use crate::style::Style;

/// A first-class edit value
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// The identity edit
    Empty,
    /// Set a cell value
    Put(CellAddress, CellValue),
    /// Set a cell value and merge a style onto it
    PutWithStyle(CellAddress, CellValue, Style),
    /// Merge a style onto a cell
    StyleCell(CellAddress, Style),
    /// Merge a style onto every cell in a range
    StyleRange(CellRange, Style),
    /// Merge a range of cells
    Merge(CellRange),
    /// Unmerge a range of cells
    Unmerge(CellRange),
    /// Clear contents in a range (unmerges intersecting regions)
    ClearContents(CellRange),
    /// Reset styles in a range
    ClearStyles(CellRange),
    /// Remove comments in a range
    ClearComments(CellRange),
    /// Attach a comment to a cell
    AddComment(CellAddress, CellComment),
    /// Remove a comment from a cell
    RemoveComment(CellAddress),
    /// Set a column width
    SetColumnWidth(u16, f64),
    /// Set a row height
    SetRowHeight(u32, f64),
    /// Hide or show a column
    SetColumnHidden(u16, bool),
    /// Hide or show a row
    SetRowHidden(u32, bool),
    /// A sequence of edits applied in order
    Batch(Vec<Patch>),
}

impl Patch {
    /// The identity edit
    pub fn empty() -> Self {
        Patch::Empty
    }

    /// Check whether this patch does nothing
    pub fn is_empty(&self) -> bool {
        match self {
            Patch::Empty => true,
            Patch::Batch(ops) => ops.iter().all(Patch::is_empty),
            _ => false,
        }
    }

    /// Sequential composition: apply `self`, then `other`.
    ///
    /// `Batch` nesting is flattened so a composed patch applies in a
    /// single pass.
    pub fn then(self, other: Patch) -> Patch {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }

        let mut ops = Vec::new();
        self.flatten_into(&mut ops);
        other.flatten_into(&mut ops);
        Patch::Batch(ops)
    }

    fn flatten_into(self, out: &mut Vec<Patch>) {
        match self {
            Patch::Empty => {}
            Patch::Batch(ops) => {
                for op in ops {
                    op.flatten_into(out);
                }
            }
            op => out.push(op),
        }
    }

    /// Short description of the operation, used in failure reports
    fn describe(&self) -> String {
        match self {
            Patch::Empty => "empty".into(),
            Patch::Put(addr, _) => format!("put {}", addr),
            Patch::PutWithStyle(addr, _, _) => format!("put-with-style {}", addr),
            Patch::StyleCell(addr, _) => format!("style {}", addr),
            Patch::StyleRange(range, _) => format!("style {}", range),
            Patch::Merge(range) => format!("merge {}", range),
            Patch::Unmerge(range) => format!("unmerge {}", range),
            Patch::ClearContents(range) => format!("clear-contents {}", range),
            Patch::ClearStyles(range) => format!("clear-styles {}", range),
            Patch::ClearComments(range) => format!("clear-comments {}", range),
            Patch::AddComment(addr, _) => format!("add-comment {}", addr),
            Patch::RemoveComment(addr) => format!("remove-comment {}", addr),
            Patch::SetColumnWidth(col, _) => format!("set-column-width {}", col),
            Patch::SetRowHeight(row, _) => format!("set-row-height {}", row),
            Patch::SetColumnHidden(col, _) => format!("set-column-hidden {}", col),
            Patch::SetRowHidden(row, _) => format!("set-row-hidden {}", row),
            Patch::Batch(_) => "batch".into(),
        }
    }
}

impl Default for Patch {
    fn default() -> Self {
        Patch::Empty
    }
}

impl Worksheet {
    /// Apply a patch, producing a new sheet.
    ///
    /// Application is all-or-nothing: on failure the original sheet is
    /// untouched and the error names the first failing operation.
    pub fn apply(&self, patch: &Patch) -> Result<Worksheet> {
        let mut next = self.clone();
        next.apply_op(patch)?;
        Ok(next)
    }

    fn apply_op(&mut self, patch: &Patch) -> Result<()> {
        match patch {
            Patch::Empty => Ok(()),
            Patch::Batch(ops) => {
                for op in ops {
                    self.apply_op(op)?;
                }
                Ok(())
            }
            op => self.apply_single(op).map_err(|e| Error::PatchFailed {
                op: op.describe(),
                source: Box::new(e),
            }),
        }
    }

    fn apply_single(&mut self, op: &Patch) -> Result<()> {
        match op {
            Patch::Empty | Patch::Batch(_) => Ok(()),
            Patch::Put(addr, value) => self.set_value_at(addr.row, addr.col, value.clone()),
            Patch::PutWithStyle(addr, value, style) => {
                self.set_value_at(addr.row, addr.col, value.clone())?;
                self.set_style_at(addr.row, addr.col, style)
            }
            Patch::StyleCell(addr, style) => self.set_style_at(addr.row, addr.col, style),
            Patch::StyleRange(range, style) => self.style_range(range, style),
            Patch::Merge(range) => self.merge_cells(range),
            Patch::Unmerge(range) => {
                self.unmerge_cells(range);
                Ok(())
            }
            Patch::ClearContents(range) => {
                self.clear_range(range);
                Ok(())
            }
            Patch::ClearStyles(range) => {
                self.clear_styles_in_range(range);
                Ok(())
            }
            Patch::ClearComments(range) => {
                self.clear_comments_in_range(range);
                Ok(())
            }
            Patch::AddComment(addr, comment) => {
                self.set_comment_at(addr.row, addr.col, comment.clone())
            }
            Patch::RemoveComment(addr) => {
                self.remove_comment_at(addr.row, addr.col);
                Ok(())
            }
            Patch::SetColumnWidth(col, width) => {
                self.set_column_width(*col, *width);
                Ok(())
            }
            Patch::SetRowHeight(row, height) => {
                self.set_row_height(*row, *height);
                Ok(())
            }
            Patch::SetColumnHidden(col, hidden) => {
                self.set_column_hidden(*col, *hidden);
                Ok(())
            }
            Patch::SetRowHidden(row, hidden) => {
                self.set_row_hidden(*row, *hidden);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    fn range(s: &str) -> CellRange {
        CellRange::parse(s).unwrap()
    }

    fn sheet_state(ws: &Worksheet) -> Vec<(u32, u16, CellValue, u32)> {
        ws.iter_cells()
            .map(|(r, c, cell)| (r, c, cell.value.clone(), cell.style_index))
            .collect()
    }

    #[test]
    fn test_identity_laws() {
        let ws = Worksheet::new("T");
        let p = Patch::Put(addr("A1"), CellValue::Number(1.0));

        let left = Patch::empty().then(p.clone());
        let right = p.clone().then(Patch::empty());

        assert_eq!(left, p);
        assert_eq!(right, p);

        let applied = ws.apply(&Patch::empty()).unwrap();
        assert_eq!(sheet_state(&applied), sheet_state(&ws));
    }

    #[test]
    fn test_associativity() {
        let p = Patch::Put(addr("A1"), CellValue::Number(1.0));
        let q = Patch::Put(addr("B1"), CellValue::Number(2.0));
        let r = Patch::Merge(range("C1:D1"));

        let lhs = p.clone().then(q.clone()).then(r.clone());
        let rhs = p.clone().then(q.clone().then(r.clone()));

        // Flattening makes composition literally associative
        assert_eq!(lhs, rhs);

        let ws = Worksheet::new("T");
        let a = ws.apply(&lhs).unwrap();
        let b = ws.apply(&rhs).unwrap();
        assert_eq!(sheet_state(&a), sheet_state(&b));
        assert_eq!(a.merged_regions(), b.merged_regions());
    }

    #[test]
    fn test_overwrite_idempotence() {
        let ws = Worksheet::new("T");

        let both = Patch::Put(addr("A1"), CellValue::Number(1.0))
            .then(Patch::Put(addr("A1"), CellValue::Number(2.0)));
        let last = Patch::Put(addr("A1"), CellValue::Number(2.0));

        let a = ws.apply(&both).unwrap();
        let b = ws.apply(&last).unwrap();
        assert_eq!(sheet_state(&a), sheet_state(&b));
    }

    #[test]
    fn test_sequential_semantics() {
        // Later operations observe the effects of earlier ones
        let ws = Worksheet::new("T");
        let patch = Patch::Put(addr("A1"), CellValue::Number(1.0))
            .then(Patch::ClearContents(range("A1:A1")))
            .then(Patch::Put(addr("A2"), CellValue::Number(3.0)));

        let out = ws.apply(&patch).unwrap();
        assert_eq!(out.value("A1").unwrap(), CellValue::Empty);
        assert_eq!(out.value("A2").unwrap().as_number(), Some(3.0));
    }

    #[test]
    fn test_batch_flattening() {
        let p = Patch::Batch(vec![
            Patch::Put(addr("A1"), CellValue::Number(1.0)),
            Patch::Batch(vec![
                Patch::Empty,
                Patch::Put(addr("A2"), CellValue::Number(2.0)),
            ]),
        ]);
        let q = Patch::Put(addr("A3"), CellValue::Number(3.0));

        match p.then(q) {
            Patch::Batch(ops) => {
                assert_eq!(ops.len(), 3);
                assert!(ops.iter().all(|op| !matches!(op, Patch::Batch(_) | Patch::Empty)));
            }
            other => panic!("expected flat batch, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_is_all_or_nothing() {
        let ws = Worksheet::new("T");
        let patch = Patch::Put(addr("A1"), CellValue::Number(1.0))
            .then(Patch::Merge(range("B1:B1"))); // invalid: single cell

        let err = ws.apply(&patch).unwrap_err();
        match err {
            Error::PatchFailed { op, .. } => assert_eq!(op, "merge B1"),
            other => panic!("unexpected error: {:?}", other),
        }

        // Original untouched
        assert_eq!(ws.value("A1").unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_merge_then_clear_contents() {
        let ws = Worksheet::new("T");
        let patch = Patch::Put(addr("A1"), CellValue::text("title"))
            .then(Patch::Merge(range("A1:D1")))
            .then(Patch::ClearContents(range("A1:D10")));

        let out = ws.apply(&patch).unwrap();
        assert!(out.merged_regions().is_empty());
        assert_eq!(out.value("A1").unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_style_and_dimension_ops() {
        let ws = Worksheet::new("T");
        let patch = Patch::StyleRange(range("A1:B2"), Style::new().bold(true))
            .then(Patch::SetColumnWidth(0, 25.0))
            .then(Patch::SetRowHidden(3, true))
            .then(Patch::AddComment(addr("B2"), CellComment::new("a", "n")));

        let out = ws.apply(&patch).unwrap();
        assert!(out.cell_style_at(0, 0).unwrap().font.bold);
        assert!(out.cell_style_at(1, 1).unwrap().font.bold);
        assert!((out.column_width(0) - 25.0).abs() < 1e-9);
        assert!(out.is_row_hidden(3));
        assert!(out.comment_at(1, 1).is_some());
    }
}
