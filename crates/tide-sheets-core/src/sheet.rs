//! Worksheet type

use std::collections::BTreeMap;

use crate::cell::{CellAddress, CellData, CellRange, CellValue, Hyperlink};
use crate::codec::{FromCellValue, ToCellValue};
use crate::comment::CellComment;
use crate::error::{Error, Result};
use crate::style::{Style, StylePool};
use crate::{MAX_COLS, MAX_ROWS};

/// Per-column display properties
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColumnProperties {
    /// Width in characters; `None` means the sheet default
    pub width: Option<f64>,
    /// Column is hidden
    pub hidden: bool,
}

/// Per-row display properties
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RowProperties {
    /// Height in points; `None` means the sheet default
    pub height: Option<f64>,
    /// Row is hidden
    pub hidden: bool,
}

/// Freeze pane settings: the first unfrozen row and column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreezePanes {
    pub row: u32,
    pub col: u16,
}

/// A worksheet (single sheet in a workbook)
///
/// Storage is sparse and row-major: only cells with content are stored,
/// and iteration yields ascending (row, column) order, which the writers
/// rely on. Mutation is modeled as replacement: cloning a sheet is cheap
/// relative to its contents and [`Worksheet::apply`] produces a new sheet.
#[derive(Debug, Clone)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Row index → column map
    rows: BTreeMap<u32, BTreeMap<u16, CellData>>,
    /// Style registry for this sheet
    styles: StylePool,
    /// Merged cell regions
    merged: Vec<CellRange>,
    /// Cell comments, keyed by (row, col)
    comments: BTreeMap<(u32, u16), CellComment>,
    /// Cell hyperlinks, keyed by (row, col)
    hyperlinks: BTreeMap<(u32, u16), Hyperlink>,
    /// Per-column properties
    column_props: BTreeMap<u16, ColumnProperties>,
    /// Per-row properties
    row_props: BTreeMap<u32, RowProperties>,
    /// Default column width in characters
    default_column_width: Option<f64>,
    /// Default row height in points
    default_row_height: Option<f64>,
    /// Freeze pane settings
    freeze_panes: Option<FreezePanes>,
}

impl Worksheet {
    /// Create a new empty worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
            styles: StylePool::new(),
            merged: Vec::new(),
            comments: BTreeMap::new(),
            hyperlinks: BTreeMap::new(),
            column_props: BTreeMap::new(),
            row_props: BTreeMap::new(),
            default_column_width: None,
            default_row_height: None,
            freeze_panes: None,
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name (uniqueness is enforced by the workbook)
    pub(crate) fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    fn validate_position(&self, row: u32, col: u16) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }
        Ok(())
    }

    // === Cell access ===

    /// Get a cell by address string (e.g., "A1")
    pub fn cell(&self, address: &str) -> Result<Option<&CellData>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cell_at(addr.row, addr.col))
    }

    /// Get a cell by row and column indices
    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellData> {
        self.rows.get(&row).and_then(|cols| cols.get(&col))
    }

    /// Get a mutable cell by row and column indices
    pub fn cell_at_mut(&mut self, row: u32, col: u16) -> Option<&mut CellData> {
        self.rows.get_mut(&row).and_then(|cols| cols.get_mut(&col))
    }

    /// Get a cell value by address string (Empty if absent)
    pub fn value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.value_at(addr.row, addr.col))
    }

    /// Get a cell value by indices (Empty if absent)
    pub fn value_at(&self, row: u32, col: u16) -> CellValue {
        self.cell_at(row, col)
            .map(|c| c.value.clone())
            .unwrap_or(CellValue::Empty)
    }

    /// Get a cell's style id (0 if absent or default)
    pub fn style_index_at(&self, row: u32, col: u16) -> u32 {
        self.cell_at(row, col).map(|c| c.style_index).unwrap_or(0)
    }

    /// Get a style by its id in this sheet's style pool
    pub fn style_by_index(&self, index: u32) -> Option<&Style> {
        self.styles.get(index)
    }

    /// Get the non-default style applied to a cell, if any
    pub fn cell_style_at(&self, row: u32, col: u16) -> Option<&Style> {
        let idx = self.style_index_at(row, col);
        if idx == 0 {
            None
        } else {
            self.styles.get(idx)
        }
    }

    /// This sheet's style registry
    pub fn style_pool(&self) -> &StylePool {
        &self.styles
    }

    /// Mutable access to the style registry
    pub fn style_pool_mut(&mut self) -> &mut StylePool {
        &mut self.styles
    }

    fn entry(&mut self, row: u32, col: u16) -> &mut CellData {
        self.rows.entry(row).or_default().entry(col).or_default()
    }

    // === Cell modification ===

    /// Set a cell value by address string
    pub fn set_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row and column indices
    pub fn set_value_at<V: Into<CellValue>>(&mut self, row: u32, col: u16, value: V) -> Result<()> {
        self.validate_position(row, col)?;
        self.entry(row, col).value = value.into();
        Ok(())
    }

    /// Set several cell values at once
    pub fn set_values<I, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (CellAddress, V)>,
        V: Into<CellValue>,
    {
        for (addr, value) in values {
            self.set_value_at(addr.row, addr.col, value)?;
        }
        Ok(())
    }

    /// Set a cell value and style in one step
    pub fn set_value_with_style<V: Into<CellValue>>(
        &mut self,
        address: &str,
        value: V,
        style: &Style,
    ) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_value_at(addr.row, addr.col, value)?;
        self.set_style_at(addr.row, addr.col, style)
    }

    /// Set a cell formula by address string
    pub fn set_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_formula_at(addr.row, addr.col, formula)
    }

    /// Set a cell formula by row and column indices
    pub fn set_formula_at(&mut self, row: u32, col: u16, formula: &str) -> Result<()> {
        self.validate_position(row, col)?;

        let formula = if formula.starts_with('=') {
            formula.to_string()
        } else {
            format!("={}", formula)
        };

        self.entry(row, col).value = CellValue::formula(formula);
        Ok(())
    }

    /// Write a native value through its codec.
    ///
    /// When the codec supplies a number-format hint, the cell's existing
    /// style (or the default) is merged with that format and registered in
    /// the sheet's style pool.
    pub fn write_cell<T: ToCellValue>(&mut self, address: &str, value: &T) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.write_cell_at(addr.row, addr.col, value)
    }

    /// Write a native value through its codec by indices
    pub fn write_cell_at<T: ToCellValue>(&mut self, row: u32, col: u16, value: &T) -> Result<()> {
        self.validate_position(row, col)?;
        let (cell_value, hint) = value.to_cell_value();

        let style_index = match hint {
            Some(format) => {
                let base = self
                    .cell_style_at(row, col)
                    .cloned()
                    .unwrap_or_else(|| self.styles.default_style().clone());
                let styled = base.with_number_format(format);
                Some(self.styles.get_or_insert(styled))
            }
            None => None,
        };

        let cell = self.entry(row, col);
        cell.value = cell_value;
        if let Some(idx) = style_index {
            cell.style_index = idx;
        }
        Ok(())
    }

    /// Read a native value through its codec
    pub fn read_cell<T: FromCellValue>(&self, address: &str) -> Result<Option<T>> {
        let addr = CellAddress::parse(address)?;
        let value = self.value_at(addr.row, addr.col);
        Ok(T::from_cell_value(&value)?)
    }

    /// Clear a cell (value, style, comment, and hyperlink)
    pub fn clear_cell(&mut self, address: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.clear_cell_at(addr.row, addr.col);
        Ok(())
    }

    /// Clear a cell by indices
    pub fn clear_cell_at(&mut self, row: u32, col: u16) {
        if let Some(cols) = self.rows.get_mut(&row) {
            cols.remove(&col);
            if cols.is_empty() {
                self.rows.remove(&row);
            }
        }
        self.comments.remove(&(row, col));
        self.hyperlinks.remove(&(row, col));
    }

    // === Styles ===

    /// Merge a style onto a cell by address string
    pub fn set_style(&mut self, address: &str, style: &Style) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_style_at(addr.row, addr.col, style)
    }

    /// Merge a style onto a cell.
    ///
    /// The overlay's non-default properties win over the cell's current
    /// style; everything else is preserved.
    pub fn set_style_at(&mut self, row: u32, col: u16, style: &Style) -> Result<()> {
        self.validate_position(row, col)?;
        let base = self
            .cell_style_at(row, col)
            .cloned()
            .unwrap_or_else(|| self.styles.default_style().clone());
        let merged = base.merged_with(style);
        let index = self.styles.get_or_insert(merged);
        self.entry(row, col).style_index = index;
        Ok(())
    }

    /// Install a style on a cell wholesale, bypassing merging
    pub fn replace_style_at(&mut self, row: u32, col: u16, style: &Style) -> Result<()> {
        self.validate_position(row, col)?;
        let index = self.styles.get_or_insert(style.clone());
        self.entry(row, col).style_index = index;
        Ok(())
    }

    /// Merge a style onto every cell in a range
    pub fn style_range(&mut self, range: &CellRange, style: &Style) -> Result<()> {
        for addr in range.cells() {
            self.set_style_at(addr.row, addr.col, style)?;
        }
        Ok(())
    }

    /// Install a style on every cell in a range, bypassing merging
    pub fn replace_style_range(&mut self, range: &CellRange, style: &Style) -> Result<()> {
        for addr in range.cells() {
            self.replace_style_at(addr.row, addr.col, style)?;
        }
        Ok(())
    }

    // === Range operations ===

    /// Get the used range: the bounding box of all cells with content.
    ///
    /// Cells whose only content is a style or a comment count as used.
    pub fn used_range(&self) -> Option<CellRange> {
        let mut bounds: Option<(u32, u16, u32, u16)> = None;

        for (&row, cols) in &self.rows {
            for &col in cols.keys() {
                bounds = Some(match bounds {
                    None => (row, col, row, col),
                    Some((min_r, min_c, max_r, max_c)) => (
                        min_r.min(row),
                        min_c.min(col),
                        max_r.max(row),
                        max_c.max(col),
                    ),
                });
            }
        }

        bounds.map(|(min_r, min_c, max_r, max_c)| {
            CellRange::from_indices(min_r, min_c, max_r, max_c)
        })
    }

    /// Clear contents of a range.
    ///
    /// Removes cell values, comments, and hyperlinks; merged regions that
    /// intersect the cleared range are unmerged.
    pub fn clear_range(&mut self, range: &CellRange) {
        for addr in range.cells() {
            self.clear_cell_at(addr.row, addr.col);
        }
        self.merged.retain(|m| !m.overlaps(range));
    }

    /// Reset styles to the default in a range (values are preserved)
    pub fn clear_styles_in_range(&mut self, range: &CellRange) {
        for addr in range.cells() {
            if let Some(cell) = self.cell_at_mut(addr.row, addr.col) {
                cell.style_index = 0;
            }
        }
        self.prune_empty_cells(range);
    }

    /// Remove comments in a range
    pub fn clear_comments_in_range(&mut self, range: &CellRange) {
        self.comments
            .retain(|&(row, col), _| !range.contains(&CellAddress::new(row, col)));
        self.prune_empty_cells(range);
    }

    /// Drop cell entries in a range that hold no value, style, comment, or
    /// hyperlink anymore
    fn prune_empty_cells(&mut self, range: &CellRange) {
        for addr in range.cells() {
            let keep = self
                .cell_at(addr.row, addr.col)
                .map(|c| !c.is_empty())
                .unwrap_or(false)
                || self.comments.contains_key(&(addr.row, addr.col))
                || self.hyperlinks.contains_key(&(addr.row, addr.col));
            if !keep {
                if let Some(cols) = self.rows.get_mut(&addr.row) {
                    cols.remove(&addr.col);
                    if cols.is_empty() {
                        self.rows.remove(&addr.row);
                    }
                }
            }
        }
    }

    // === Merged cells ===

    /// Get merged regions
    pub fn merged_regions(&self) -> &[CellRange] {
        &self.merged
    }

    /// Merge a range of cells
    pub fn merge_cells(&mut self, range: &CellRange) -> Result<()> {
        if range.cell_count() < 2 {
            return Err(Error::MergeConflict(
                range.to_string(),
                "a merged region must span at least two cells".into(),
            ));
        }
        if range.end.row >= MAX_ROWS || range.end.col >= MAX_COLS {
            return Err(Error::MergeConflict(
                range.to_string(),
                "region exceeds sheet bounds".into(),
            ));
        }
        for existing in &self.merged {
            if range.overlaps(existing) {
                return Err(Error::MergeConflict(
                    range.to_string(),
                    format!("overlaps existing merged region {}", existing),
                ));
            }
        }
        self.merged.push(*range);
        Ok(())
    }

    /// Unmerge a previously merged range; returns whether it was found
    pub fn unmerge_cells(&mut self, range: &CellRange) -> bool {
        let before = self.merged.len();
        self.merged.retain(|m| {
            !(m.start.row == range.start.row
                && m.start.col == range.start.col
                && m.end.row == range.end.row
                && m.end.col == range.end.col)
        });
        self.merged.len() != before
    }

    // === Comments ===

    /// Set a comment on a cell by address string.
    ///
    /// Commenting an otherwise empty cell creates the cell entry, so the
    /// comment participates in `used_range`.
    pub fn set_comment(&mut self, address: &str, comment: CellComment) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_comment_at(addr.row, addr.col, comment)
    }

    /// Set a comment on a cell by indices
    pub fn set_comment_at(&mut self, row: u32, col: u16, comment: CellComment) -> Result<()> {
        self.validate_position(row, col)?;
        self.entry(row, col);
        self.comments.insert((row, col), comment);
        Ok(())
    }

    /// Get a comment by address string
    pub fn comment(&self, address: &str) -> Result<Option<&CellComment>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.comment_at(addr.row, addr.col))
    }

    /// Get a comment by indices
    pub fn comment_at(&self, row: u32, col: u16) -> Option<&CellComment> {
        self.comments.get(&(row, col))
    }

    /// Remove a comment; returns it if present
    pub fn remove_comment(&mut self, address: &str) -> Result<Option<CellComment>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.remove_comment_at(addr.row, addr.col))
    }

    /// Remove a comment by indices
    pub fn remove_comment_at(&mut self, row: u32, col: u16) -> Option<CellComment> {
        let removed = self.comments.remove(&(row, col));
        if removed.is_some() {
            self.prune_empty_cells(&CellRange::single(CellAddress::new(row, col)));
        }
        removed
    }

    /// Number of comments on this sheet
    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// Iterate over all comments in (row, col) order
    pub fn comments(&self) -> impl Iterator<Item = ((u32, u16), &CellComment)> {
        self.comments.iter().map(|(&k, v)| (k, v))
    }

    /// The distinct comment authors, in first-appearance order
    pub fn comment_authors(&self) -> Vec<&str> {
        let mut authors: Vec<&str> = Vec::new();
        for comment in self.comments.values() {
            if !comment.author.is_empty() && !authors.contains(&comment.author.as_str()) {
                authors.push(&comment.author);
            }
        }
        authors
    }

    // === Hyperlinks ===

    /// Set a hyperlink on a cell by indices
    pub fn set_hyperlink_at(&mut self, row: u32, col: u16, link: Hyperlink) -> Result<()> {
        self.validate_position(row, col)?;
        self.entry(row, col);
        self.hyperlinks.insert((row, col), link);
        Ok(())
    }

    /// Get a hyperlink by indices
    pub fn hyperlink_at(&self, row: u32, col: u16) -> Option<&Hyperlink> {
        self.hyperlinks.get(&(row, col))
    }

    /// Iterate over all hyperlinks in (row, col) order
    pub fn hyperlinks(&self) -> impl Iterator<Item = ((u32, u16), &Hyperlink)> {
        self.hyperlinks.iter().map(|(&k, v)| (k, v))
    }

    // === Row/column properties ===

    /// Set a column width in characters
    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_props.entry(col).or_default().width = Some(width);
    }

    /// Get a column's width, falling back to the sheet default
    pub fn column_width(&self, col: u16) -> f64 {
        self.column_props
            .get(&col)
            .and_then(|p| p.width)
            .or(self.default_column_width)
            .unwrap_or(8.43)
    }

    /// Hide or show a column
    pub fn set_column_hidden(&mut self, col: u16, hidden: bool) {
        self.column_props.entry(col).or_default().hidden = hidden;
    }

    /// Check if a column is hidden
    pub fn is_column_hidden(&self, col: u16) -> bool {
        self.column_props.get(&col).map(|p| p.hidden).unwrap_or(false)
    }

    /// Set a row height in points
    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.row_props.entry(row).or_default().height = Some(height);
    }

    /// Get a row's height, falling back to the sheet default
    pub fn row_height(&self, row: u32) -> f64 {
        self.row_props
            .get(&row)
            .and_then(|p| p.height)
            .or(self.default_row_height)
            .unwrap_or(15.0)
    }

    /// Hide or show a row
    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) {
        self.row_props.entry(row).or_default().hidden = hidden;
    }

    /// Check if a row is hidden
    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.row_props.get(&row).map(|p| p.hidden).unwrap_or(false)
    }

    /// All explicit column properties
    pub fn column_properties(&self) -> &BTreeMap<u16, ColumnProperties> {
        &self.column_props
    }

    /// All explicit row properties
    pub fn row_properties(&self) -> &BTreeMap<u32, RowProperties> {
        &self.row_props
    }

    /// Sheet default column width, if set
    pub fn default_column_width(&self) -> Option<f64> {
        self.default_column_width
    }

    /// Set the sheet default column width
    pub fn set_default_column_width(&mut self, width: f64) {
        self.default_column_width = Some(width);
    }

    /// Sheet default row height, if set
    pub fn default_row_height(&self) -> Option<f64> {
        self.default_row_height
    }

    /// Set the sheet default row height
    pub fn set_default_row_height(&mut self, height: f64) {
        self.default_row_height = Some(height);
    }

    // === Freeze panes ===

    /// Get freeze pane settings
    pub fn freeze_panes(&self) -> Option<FreezePanes> {
        self.freeze_panes
    }

    /// Freeze rows/columns above and left of (row, col); (0, 0) unfreezes
    pub fn set_freeze_panes(&mut self, row: u32, col: u16) {
        if row == 0 && col == 0 {
            self.freeze_panes = None;
        } else {
            self.freeze_panes = Some(FreezePanes { row, col });
        }
    }

    // === Iteration ===

    /// Number of stored cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|cols| cols.len()).sum()
    }

    /// Check if the worksheet has no stored cells
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over all stored cells in (row, col) order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.rows.iter().flat_map(|(&row, cols)| {
            cols.iter().map(move |(&col, cell)| (row, col, cell))
        })
    }

    /// Iterate over stored cells within a range, in (row, col) order
    pub fn iter_cells_in_range<'a>(
        &'a self,
        range: &CellRange,
    ) -> impl Iterator<Item = (u32, u16, &'a CellData)> {
        let (start_col, end_col) = (range.start.col, range.end.col);
        self.rows
            .range(range.start.row..=range.end.row)
            .flat_map(move |(&row, cols)| {
                cols.range(start_col..=end_col)
                    .map(move |(&col, cell)| (row, col, cell))
            })
    }

    // === Formula support ===

    /// Iterate over formula cells: (row, col, formula text)
    pub fn formula_cells(&self) -> impl Iterator<Item = (u32, u16, &str)> {
        self.iter_cells().filter_map(|(row, col, cell)| {
            cell.value.formula_text().map(|text| (row, col, text))
        })
    }

    /// Get the formula text at a position, if it is a formula cell
    pub fn formula_at(&self, row: u32, col: u16) -> Option<&str> {
        self.cell_at(row, col).and_then(|c| c.value.formula_text())
    }

    /// Store the cached result of a formula cell
    pub fn set_formula_result(&mut self, row: u32, col: u16, value: CellValue) -> Result<()> {
        let cell = self.cell_at_mut(row, col).ok_or(Error::InvalidCellRef {
            input: CellAddress::new(row, col).to_a1_string(),
            reason: "cell not found".into(),
        })?;

        match &mut cell.value {
            CellValue::Formula { cached_value, .. } => {
                *cached_value = Some(Box::new(value));
                Ok(())
            }
            other => Err(Error::InvalidCellRef {
                input: CellAddress::new(row, col).to_a1_string(),
                reason: format!("cell is a {}, not a formula", other.type_name()),
            }),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellError;
    use crate::style::NumberFormat;

    #[test]
    fn test_new_worksheet() {
        let ws = Worksheet::new("Test");
        assert_eq!(ws.name(), "Test");
        assert!(ws.is_empty());
    }

    #[test]
    fn test_set_cell_values() {
        let mut ws = Worksheet::new("Test");

        ws.set_value("A1", "Hello").unwrap();
        ws.set_value("B1", 42.0).unwrap();
        ws.set_value("C1", true).unwrap();

        assert_eq!(ws.value("A1").unwrap().as_str(), Some("Hello"));
        assert_eq!(ws.value("B1").unwrap().as_number(), Some(42.0));
        assert_eq!(ws.value("C1").unwrap().as_bool(), Some(true));
        assert_eq!(ws.value("Z99").unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_set_formula() {
        let mut ws = Worksheet::new("Test");

        ws.set_formula("A1", "SUM(B1:B10)").unwrap();
        let value = ws.value("A1").unwrap();
        assert!(value.is_formula());
        assert_eq!(value.formula_text(), Some("=SUM(B1:B10)"));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut ws = Worksheet::new("Test");
        assert!(ws.set_value_at(MAX_ROWS, 0, 1.0).is_err());
        assert!(ws.set_value_at(0, MAX_COLS, 1.0).is_err());
    }

    #[test]
    fn test_used_range() {
        let mut ws = Worksheet::new("Test");

        assert!(ws.used_range().is_none());

        ws.set_value_at(5, 3, "A").unwrap();
        ws.set_value_at(10, 7, "B").unwrap();

        let range = ws.used_range().unwrap();
        assert_eq!(range.start.row, 5);
        assert_eq!(range.start.col, 3);
        assert_eq!(range.end.row, 10);
        assert_eq!(range.end.col, 7);
    }

    #[test]
    fn test_used_range_counts_comment_and_style_only_cells() {
        let mut ws = Worksheet::new("Test");

        // Comment on an otherwise empty cell
        ws.set_comment_at(2, 2, CellComment::new("a", "note")).unwrap();
        // Style on an otherwise empty cell
        ws.set_style_at(4, 0, &Style::new().bold(true)).unwrap();

        let range = ws.used_range().unwrap();
        assert_eq!(range.start.row, 2);
        assert_eq!(range.start.col, 0);
        assert_eq!(range.end.row, 4);
        assert_eq!(range.end.col, 2);
    }

    #[test]
    fn test_style_merge_on_cell() {
        let mut ws = Worksheet::new("Test");

        ws.set_style("A1", &Style::new().bold(true)).unwrap();
        ws.set_style("A1", &Style::new().italic(true)).unwrap();

        let style = ws.cell_style_at(0, 0).unwrap();
        assert!(style.font.bold);
        assert!(style.font.italic);

        // Replace mode discards the previous style
        ws.replace_style_at(0, 0, &Style::new().italic(true)).unwrap();
        let style = ws.cell_style_at(0, 0).unwrap();
        assert!(!style.font.bold);
        assert!(style.font.italic);
    }

    #[test]
    fn test_merge_cells() {
        let mut ws = Worksheet::new("Test");

        let range = CellRange::parse("A1:C3").unwrap();
        ws.merge_cells(&range).unwrap();
        assert_eq!(ws.merged_regions().len(), 1);

        // Overlapping merge is rejected
        let range2 = CellRange::parse("B2:D4").unwrap();
        assert!(ws.merge_cells(&range2).is_err());

        // Single cell is rejected
        assert!(ws.merge_cells(&CellRange::parse("F1").unwrap()).is_err());

        assert!(ws.unmerge_cells(&range));
        assert!(ws.merged_regions().is_empty());
        assert!(!ws.unmerge_cells(&range));
    }

    #[test]
    fn test_clear_range_unmerges() {
        let mut ws = Worksheet::new("Test");

        ws.set_value("A1", "x").unwrap();
        ws.merge_cells(&CellRange::parse("A1:D1").unwrap()).unwrap();
        ws.clear_range(&CellRange::parse("A1:D10").unwrap());

        assert_eq!(ws.value("A1").unwrap(), CellValue::Empty);
        assert!(ws.merged_regions().is_empty());
    }

    #[test]
    fn test_comments() {
        let mut ws = Worksheet::new("Test");

        assert_eq!(ws.comment_count(), 0);

        ws.set_comment("A1", CellComment::new("John", "Review this"))
            .unwrap();
        assert_eq!(ws.comment_count(), 1);

        let comment = ws.comment("A1").unwrap().unwrap();
        assert_eq!(comment.author, "John");
        assert_eq!(comment.text, "Review this");

        ws.set_comment_at(1, 1, CellComment::new("John", "Another")).unwrap();
        ws.set_comment_at(2, 2, CellComment::new("Jane", "Mine")).unwrap();
        assert_eq!(ws.comment_authors(), vec!["John", "Jane"]);

        let removed = ws.remove_comment("A1").unwrap();
        assert!(removed.is_some());
        assert_eq!(ws.comment_count(), 2);
    }

    #[test]
    fn test_row_column_properties() {
        let mut ws = Worksheet::new("Test");

        assert!((ws.row_height(0) - 15.0).abs() < 0.001);
        assert!((ws.column_width(0) - 8.43).abs() < 0.001);

        ws.set_row_height(5, 30.0);
        ws.set_column_width(3, 20.0);
        ws.set_column_hidden(4, true);

        assert!((ws.row_height(5) - 30.0).abs() < 0.001);
        assert!((ws.column_width(3) - 20.0).abs() < 0.001);
        assert!(ws.is_column_hidden(4));
        assert!(!ws.is_column_hidden(3));

        ws.set_default_column_width(12.0);
        assert!((ws.column_width(100) - 12.0).abs() < 0.001);
    }

    #[test]
    fn test_codec_write_registers_format_style() {
        let mut ws = Worksheet::new("Test");

        ws.write_cell("A1", &42i64).unwrap();

        let style = ws.cell_style_at(0, 0).unwrap();
        assert_eq!(style.number_format, NumberFormat::Integer);
        assert_eq!(ws.read_cell::<i64>("A1").unwrap(), Some(42));

        // Writing twice with the same hint does not grow the pool
        let before = ws.style_pool().len();
        ws.write_cell("A2", &7i64).unwrap();
        assert_eq!(ws.style_pool().len(), before);
    }

    #[test]
    fn test_formula_result_caching() {
        let mut ws = Worksheet::new("Test");
        ws.set_formula("A1", "=1+1").unwrap();

        ws.set_formula_result(0, 0, CellValue::Number(2.0)).unwrap();
        assert_eq!(ws.value("A1").unwrap().as_number(), Some(2.0));

        ws.set_value("B1", 5.0).unwrap();
        assert!(ws.set_formula_result(0, 1, CellValue::Number(1.0)).is_err());
        assert!(ws
            .set_formula_result(9, 9, CellValue::Error(CellError::Na))
            .is_err());
    }

    #[test]
    fn test_iter_cells_row_major() {
        let mut ws = Worksheet::new("Test");
        ws.set_value_at(1, 1, 4.0).unwrap();
        ws.set_value_at(0, 1, 2.0).unwrap();
        ws.set_value_at(1, 0, 3.0).unwrap();
        ws.set_value_at(0, 0, 1.0).unwrap();

        let order: Vec<(u32, u16)> = ws.iter_cells().map(|(r, c, _)| (r, c)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }
}
