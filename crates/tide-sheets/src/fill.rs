//! Fill/drag: copy a source block across a target range, shifting
//! formulas as they move

use tide_sheets_core::{CellRange, CellValue, Error, Result, Worksheet};
use tide_sheets_formula::shift_formula;

/// Direction of a fill operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillDirection {
    Down,
    Right,
}

/// Extension trait adding `fill` to [`Worksheet`]
pub trait SheetFillExt {
    /// Copy the source block across the target range.
    ///
    /// Filling `Down` requires the target to span the same columns as the
    /// source; filling `Right` requires the same rows. The target must
    /// contain the source. Values and styles copy as-is; formulas shift
    /// by their offset from the source, preserving `$` anchors.
    fn fill(&mut self, source: &CellRange, target: &CellRange, direction: FillDirection)
        -> Result<()>;
}

impl SheetFillExt for Worksheet {
    fn fill(
        &mut self,
        source: &CellRange,
        target: &CellRange,
        direction: FillDirection,
    ) -> Result<()> {
        match direction {
            FillDirection::Down => {
                if source.start.col != target.start.col || source.end.col != target.end.col {
                    return Err(Error::InvalidFill(
                        "filling down requires matching column spans".into(),
                    ));
                }
            }
            FillDirection::Right => {
                if source.start.row != target.start.row || source.end.row != target.end.row {
                    return Err(Error::InvalidFill(
                        "filling right requires matching row spans".into(),
                    ));
                }
            }
        }

        if !target.contains_range(source) {
            return Err(Error::InvalidFill(
                "target range must contain the source".into(),
            ));
        }

        let src_rows = source.row_count();
        let src_cols = source.col_count();

        for addr in target.cells() {
            if source.contains(&addr) {
                continue;
            }

            // Each target cell mirrors the source cell at the same offset
            // within a repeating tile
            let (src_row, src_col, d_row, d_col) = match direction {
                FillDirection::Down => {
                    let offset = addr.row - source.start.row;
                    let tile = offset % src_rows;
                    let shift_rows = (offset - tile) as i64;
                    (source.start.row + tile, addr.col, shift_rows, 0i64)
                }
                FillDirection::Right => {
                    let offset = addr.col - source.start.col;
                    let tile = offset % src_cols;
                    let shift_cols = (offset - tile) as i64;
                    (addr.row, source.start.col + tile, 0i64, shift_cols)
                }
            };

            self.copy_shifted((src_row, src_col), (addr.row, addr.col), d_col, d_row)?;
        }

        Ok(())
    }
}

trait CopyShifted {
    fn copy_shifted(
        &mut self,
        from: (u32, u16),
        to: (u32, u16),
        delta_col: i64,
        delta_row: i64,
    ) -> Result<()>;
}

impl CopyShifted for Worksheet {
    fn copy_shifted(
        &mut self,
        from: (u32, u16),
        to: (u32, u16),
        delta_col: i64,
        delta_row: i64,
    ) -> Result<()> {
        let data = self.cell_at(from.0, from.1).cloned();

        let data = match data {
            Some(data) => data,
            None => {
                self.clear_cell_at(to.0, to.1);
                return Ok(());
            }
        };

        let value = match &data.value {
            CellValue::Formula { text, .. } => {
                let shifted = shift_formula(text, delta_col, delta_row).map_err(|e| {
                    Error::InvalidFill(format!("formula at source failed to shift: {}", e))
                })?;
                // Shifted copies start without a cached result
                CellValue::formula(shifted)
            }
            other => other.clone(),
        };

        self.set_value_at(to.0, to.1, value)?;
        if data.style_index != 0 {
            if let Some(style) = self.style_by_index(data.style_index).cloned() {
                self.replace_style_at(to.0, to.1, &style)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(s: &str) -> CellRange {
        CellRange::parse(s).unwrap()
    }

    #[test]
    fn test_fill_down_shifts_relative_refs() {
        let mut ws = Worksheet::new("S");
        ws.set_formula("B1", "=A1*2").unwrap();

        ws.fill(&range("B1"), &range("B1:B3"), FillDirection::Down)
            .unwrap();

        assert_eq!(ws.value("B2").unwrap().formula_text(), Some("=A2*2"));
        assert_eq!(ws.value("B3").unwrap().formula_text(), Some("=A3*2"));
    }

    #[test]
    fn test_fill_down_preserves_absolute_anchors() {
        let mut ws = Worksheet::new("S");
        ws.set_formula("B1", "=$A$1*ROW()").unwrap();

        ws.fill(&range("B1"), &range("B1:B3"), FillDirection::Down)
            .unwrap();

        assert_eq!(
            ws.value("B2").unwrap().formula_text(),
            Some("=$A$1*ROW()")
        );
        assert_eq!(
            ws.value("B3").unwrap().formula_text(),
            Some("=$A$1*ROW()")
        );
    }

    #[test]
    fn test_fill_right_copies_values() {
        let mut ws = Worksheet::new("S");
        ws.set_value("A1", 7.0).unwrap();
        ws.set_formula("A2", "=A1+1").unwrap();

        ws.fill(&range("A1:A2"), &range("A1:C2"), FillDirection::Right)
            .unwrap();

        assert_eq!(ws.value("B1").unwrap().as_number(), Some(7.0));
        assert_eq!(ws.value("C1").unwrap().as_number(), Some(7.0));
        assert_eq!(ws.value("B2").unwrap().formula_text(), Some("=B1+1"));
        assert_eq!(ws.value("C2").unwrap().formula_text(), Some("=C1+1"));
    }

    #[test]
    fn test_fill_validates_spans() {
        let mut ws = Worksheet::new("S");
        ws.set_value("A1", 1.0).unwrap();

        // Down fill with mismatched columns
        assert!(ws
            .fill(&range("A1:A1"), &range("A1:B3"), FillDirection::Down)
            .is_err());
        // Target that does not contain the source
        assert!(ws
            .fill(&range("A1"), &range("B1:B3"), FillDirection::Down)
            .is_err());
    }

    #[test]
    fn test_fill_repeats_multi_row_source() {
        let mut ws = Worksheet::new("S");
        ws.set_value("A1", 1.0).unwrap();
        ws.set_value("A2", 2.0).unwrap();

        ws.fill(&range("A1:A2"), &range("A1:A6"), FillDirection::Down)
            .unwrap();

        for (row, expected) in [(2, 1.0), (3, 2.0), (4, 1.0), (5, 2.0)] {
            assert_eq!(ws.value_at(row, 0).as_number(), Some(expected));
        }
    }
}
