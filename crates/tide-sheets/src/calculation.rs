//! Workbook recalculation
//!
//! Drives the formula engine's dependency-checked evaluation over every
//! sheet and writes the results back as cached values, so a subsequent
//! write persists fresh results next to each formula.

use tide_sheets_core::Workbook;
use tide_sheets_formula::{evaluate_with_dependency_check, FormulaResult};

/// Statistics from a recalculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Number of formula cells evaluated
    pub cells_calculated: usize,
    /// Number of cells whose result is an error value
    pub errors: usize,
}

/// Extension trait adding recalculation to [`Workbook`]
pub trait WorkbookCalculationExt {
    /// Recalculate every formula cell on every sheet.
    ///
    /// Fails with `CircularReference` when any sheet contains a formula
    /// cycle; in that case no sheet is modified.
    fn recalculate(&mut self) -> FormulaResult<CalculationStats>;

    /// Recalculate one sheet
    fn recalculate_sheet(&mut self, sheet_index: usize) -> FormulaResult<CalculationStats>;
}

impl WorkbookCalculationExt for Workbook {
    fn recalculate(&mut self) -> FormulaResult<CalculationStats> {
        // Evaluate everything first so a cycle on any sheet aborts before
        // results land anywhere
        let mut per_sheet = Vec::with_capacity(self.sheet_count());
        for sheet in self.sheets() {
            per_sheet.push(evaluate_with_dependency_check(sheet, &[])?);
        }

        let mut stats = CalculationStats::default();
        for (index, results) in per_sheet.into_iter().enumerate() {
            let sheet = match self.sheet_mut(index) {
                Some(sheet) => sheet,
                None => continue,
            };
            for (key, value) in results {
                stats.cells_calculated += 1;
                if value.is_error() {
                    stats.errors += 1;
                }
                let _ = sheet.set_formula_result(key.row, key.col, value);
            }
        }

        Ok(stats)
    }

    fn recalculate_sheet(&mut self, sheet_index: usize) -> FormulaResult<CalculationStats> {
        let results = match self.sheet(sheet_index) {
            Some(sheet) => evaluate_with_dependency_check(sheet, &[])?,
            None => return Ok(CalculationStats::default()),
        };

        let mut stats = CalculationStats::default();
        if let Some(sheet) = self.sheet_mut(sheet_index) {
            for (key, value) in results {
                stats.cells_calculated += 1;
                if value.is_error() {
                    stats.errors += 1;
                }
                let _ = sheet.set_formula_result(key.row, key.col, value);
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tide_sheets_formula::FormulaError;

    #[test]
    fn test_recalculate_writes_cached_values() {
        let mut wb = Workbook::new();
        let sheet = wb.sheet_mut(0).unwrap();
        sheet.set_value("A1", 10.0).unwrap();
        sheet.set_value("A2", 20.0).unwrap();
        sheet.set_formula("A3", "=A1+A2").unwrap();
        sheet.set_formula("A4", "=A3*2").unwrap();

        let stats = wb.recalculate().unwrap();
        assert_eq!(stats.cells_calculated, 2);
        assert_eq!(stats.errors, 0);

        let sheet = wb.sheet(0).unwrap();
        assert_eq!(sheet.value("A3").unwrap().as_number(), Some(30.0));
        assert_eq!(sheet.value("A4").unwrap().as_number(), Some(60.0));
    }

    #[test]
    fn test_recalculate_counts_error_values() {
        let mut wb = Workbook::new();
        wb.sheet_mut(0).unwrap().set_formula("A1", "=1/0").unwrap();

        let stats = wb.recalculate().unwrap();
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_recalculate_rejects_cycles_without_mutation() {
        let mut wb = Workbook::new();
        {
            let sheet = wb.sheet_mut(0).unwrap();
            sheet.set_formula("A1", "=B1").unwrap();
            sheet.set_formula("B1", "=A1").unwrap();
        }

        assert!(matches!(
            wb.recalculate(),
            Err(FormulaError::CircularReference(_))
        ));

        // Nothing was cached
        let sheet = wb.sheet(0).unwrap();
        assert!(matches!(
            sheet.value("A1").unwrap(),
            tide_sheets_core::CellValue::Formula {
                cached_value: None,
                ..
            }
        ));
    }
}
