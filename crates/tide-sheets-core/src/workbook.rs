//! Workbook type - the main document structure

use crate::error::{Error, Result};
use crate::sheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// Sheet names that Excel reserves for internal use
const RESERVED_SHEET_NAMES: &[&str] = &["History"];

/// A workbook (spreadsheet document)
///
/// A workbook holds an ordered sequence of uniquely named worksheets plus
/// document-level settings. Like [`Worksheet`], it is a value: cloning is
/// supported and mutation of a shared workbook is modeled as replacement.
#[derive(Debug, Clone)]
pub struct Workbook {
    /// Worksheets in order
    worksheets: Vec<Worksheet>,
    /// Active sheet index; always < worksheets.len() when non-empty
    active_sheet: usize,
    /// Workbook settings
    settings: WorkbookSettings,
    /// Document metadata
    properties: DocumentProperties,
    /// Package parts preserved verbatim for round-trip (themes, macros, ...)
    preserved_parts: Vec<PreservedPart>,
}

impl Workbook {
    /// Create a new workbook with a single sheet named "Sheet1"
    pub fn new() -> Self {
        let mut wb = Self::empty();
        wb.add_sheet_named("Sheet1").unwrap();
        wb
    }

    /// Create a workbook with no worksheets
    ///
    /// Intended for readers that add sheets as they decode; most callers
    /// want [`Workbook::new`].
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
            active_sheet: 0,
            settings: WorkbookSettings::default(),
            properties: DocumentProperties::default(),
            preserved_parts: Vec::new(),
        }
    }

    /// Number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Check if the workbook has no worksheets
    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    /// Get a worksheet by index
    pub fn sheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Get a mutable worksheet by index
    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Get a worksheet by name
    pub fn sheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets.iter().find(|ws| ws.name() == name)
    }

    /// Get a mutable worksheet by name
    pub fn sheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.worksheets.iter_mut().find(|ws| ws.name() == name)
    }

    /// Get the index of a worksheet by name
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.name() == name)
    }

    /// Iterate over all worksheets in order
    pub fn sheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Iterate over all worksheets mutably
    pub fn sheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.worksheets.iter_mut()
    }

    /// Add a new empty worksheet at the end, generating a unique name
    pub fn add_sheet(&mut self) -> Result<usize> {
        let name = self.generate_sheet_name();
        self.add_sheet_named(&name)
    }

    /// Add a new empty worksheet with the given name at the end
    pub fn add_sheet_named(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name, None)?;
        let index = self.worksheets.len();
        self.worksheets.push(Worksheet::new(name));
        Ok(index)
    }

    /// Insert a new empty worksheet at a specific index.
    ///
    /// The previously active sheet stays active, whatever index it ends
    /// up at.
    pub fn insert_sheet(&mut self, index: usize, name: &str) -> Result<()> {
        if index > self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.validate_sheet_name(name, None)?;

        let active = self.active_sheet_name();
        self.worksheets.insert(index, Worksheet::new(name));
        self.retarget_active(active);
        Ok(())
    }

    /// Add an existing worksheet to the workbook
    pub fn add_existing_sheet(&mut self, sheet: Worksheet) -> Result<usize> {
        self.validate_sheet_name(sheet.name(), None)?;
        let index = self.worksheets.len();
        self.worksheets.push(sheet);
        Ok(index)
    }

    /// Replace a worksheet by name, producing the previous sheet
    pub fn put_sheet(&mut self, name: &str, sheet: Worksheet) -> Result<Worksheet> {
        let index = self
            .sheet_index(name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))?;
        if sheet.name() != name {
            self.validate_sheet_name(sheet.name(), Some(index))?;
        }
        Ok(std::mem::replace(&mut self.worksheets[index], sheet))
    }

    /// Remove a worksheet by index.
    ///
    /// Removing the last remaining sheet is rejected. If the removed
    /// sheet was the active one, the active pointer falls back to a
    /// neighbor; otherwise the active sheet is unchanged.
    pub fn remove_sheet(&mut self, index: usize) -> Result<Worksheet> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        if self.worksheets.len() == 1 {
            return Err(Error::DeleteLastSheet);
        }

        let active = self.active_sheet_name();
        let sheet = self.worksheets.remove(index);
        self.retarget_active(active);

        Ok(sheet)
    }

    /// Name of the currently active sheet, if any
    fn active_sheet_name(&self) -> Option<String> {
        self.worksheets
            .get(self.active_sheet)
            .map(|ws| ws.name().to_string())
    }

    /// Point `active_sheet` back at the sheet that was active before a
    /// structural edit. If that sheet is gone, clamp into range.
    fn retarget_active(&mut self, previous: Option<String>) {
        self.active_sheet = previous
            .and_then(|name| self.sheet_index(&name))
            .unwrap_or_else(|| {
                self.active_sheet
                    .min(self.worksheets.len().saturating_sub(1))
            });
    }

    /// Rename a worksheet
    pub fn rename_sheet(&mut self, index: usize, new_name: &str) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.validate_sheet_name(new_name, Some(index))?;
        self.worksheets[index].set_name(new_name);
        Ok(())
    }

    /// Get the active sheet index
    pub fn active_sheet(&self) -> usize {
        self.active_sheet
    }

    /// Set the active sheet index
    pub fn activate(&mut self, index: usize) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.active_sheet = index;
        Ok(())
    }

    /// Get workbook settings
    pub fn settings(&self) -> &WorkbookSettings {
        &self.settings
    }

    /// Get mutable workbook settings
    pub fn settings_mut(&mut self) -> &mut WorkbookSettings {
        &mut self.settings
    }

    /// Get document properties
    pub fn properties(&self) -> &DocumentProperties {
        &self.properties
    }

    /// Get mutable document properties
    pub fn properties_mut(&mut self) -> &mut DocumentProperties {
        &mut self.properties
    }

    /// Package parts preserved for round-trip
    pub fn preserved_parts(&self) -> &[PreservedPart] {
        &self.preserved_parts
    }

    /// Record a package part to preserve verbatim on write
    pub fn add_preserved_part(&mut self, part: PreservedPart) {
        self.preserved_parts.push(part);
    }

    /// Validate a sheet name: format rules first, then uniqueness within
    /// this workbook. `exclude_index` exempts one sheet from the
    /// duplicate check (for renames).
    fn validate_sheet_name(&self, name: &str, exclude_index: Option<usize>) -> Result<()> {
        check_name_format(name)?;
        self.ensure_unique_name(name, exclude_index)
    }

    /// Reject names that collide (case-insensitively) with an existing
    /// sheet other than `exclude_index`
    fn ensure_unique_name(&self, name: &str, exclude_index: Option<usize>) -> Result<()> {
        let lowered = name.to_lowercase();
        let clash = self
            .worksheets
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != exclude_index)
            .any(|(_, ws)| ws.name().to_lowercase() == lowered);

        if clash {
            Err(Error::DuplicateSheetName(name.into()))
        } else {
            Ok(())
        }
    }

    /// Generate a unique "SheetN" name: count up from the sheet count and
    /// take the first candidate that validates
    fn generate_sheet_name(&self) -> String {
        (self.worksheets.len() + 1..)
            .map(|n| format!("Sheet{}", n))
            .find(|candidate| self.validate_sheet_name(candidate, None).is_ok())
            .unwrap_or_default()
    }
}

/// Format rules for a sheet name: non-empty, at most
/// [`MAX_SHEET_NAME_LEN`] characters, none of the characters the file
/// format forbids, and not in the reserved set
fn check_name_format(name: &str) -> Result<()> {
    const FORBIDDEN: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];

    let reason = if name.is_empty() {
        Some("name cannot be empty".to_string())
    } else if name.chars().count() > MAX_SHEET_NAME_LEN {
        Some(format!("name exceeds {} characters", MAX_SHEET_NAME_LEN))
    } else if let Some(c) = name.chars().find(|c| FORBIDDEN.contains(c)) {
        Some(format!("name cannot contain '{}'", c))
    } else if RESERVED_SHEET_NAMES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(name))
    {
        Some("name is reserved".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidSheetName {
            name: name.into(),
            reason,
        }),
        None => Ok(()),
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

/// Workbook-level settings
#[derive(Debug, Clone)]
pub struct WorkbookSettings {
    /// Date system: false = 1900 (Windows), true = 1904 (classic Mac)
    pub date_1904: bool,
}

impl Default for WorkbookSettings {
    fn default() -> Self {
        Self { date_1904: false }
    }
}

/// Document metadata (docProps)
///
/// Timestamps default to `None`; the writer substitutes a fixed epoch so
/// identical workbook values produce identical bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentProperties {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub company: Option<String>,
    /// Creation time as ISO-8601 text
    pub created: Option<String>,
    /// Last-modified time as ISO-8601 text
    pub modified: Option<String>,
}

/// A package part preserved verbatim for round-trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedPart {
    /// Part name (ZIP entry path)
    pub name: String,
    /// Declared content type, if the source package had one
    pub content_type: Option<String>,
    /// Raw bytes
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_workbook() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.sheet(0).unwrap().name(), "Sheet1");
        assert_eq!(wb.active_sheet(), 0);
    }

    #[test]
    fn test_add_sheets() {
        let mut wb = Workbook::new();

        let idx = wb.add_sheet().unwrap();
        assert_eq!(idx, 1);
        assert_eq!(wb.sheet_count(), 2);

        let idx = wb.add_sheet_named("Data").unwrap();
        assert_eq!(idx, 2);
        assert_eq!(wb.sheet(2).unwrap().name(), "Data");
    }

    #[test]
    fn test_duplicate_name() {
        let mut wb = Workbook::new();

        // Case-insensitive duplicate check
        assert!(wb.add_sheet_named("SHEET1").is_err());
        assert!(wb.add_sheet_named("sheet1").is_err());
    }

    #[test]
    fn test_invalid_sheet_name() {
        let mut wb = Workbook::new();

        assert!(wb.add_sheet_named("").is_err());
        assert!(wb.add_sheet_named("Sheet/1").is_err());
        assert!(wb.add_sheet_named("Sheet:1").is_err());
        assert!(wb.add_sheet_named("Sheet[1]").is_err());
        assert!(wb.add_sheet_named("history").is_err()); // reserved
        assert!(wb.add_sheet_named(&"A".repeat(MAX_SHEET_NAME_LEN + 1)).is_err());

        // Exactly at the limit is fine
        assert!(wb.add_sheet_named(&"A".repeat(MAX_SHEET_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_rename_sheet() {
        let mut wb = Workbook::new();
        wb.add_sheet_named("Data").unwrap();

        wb.rename_sheet(1, "Data2").unwrap();
        assert_eq!(wb.sheet(1).unwrap().name(), "Data2");

        // Renaming to itself is allowed
        wb.rename_sheet(1, "Data2").unwrap();

        // Renaming onto another sheet is not
        assert!(wb.rename_sheet(1, "Sheet1").is_err());
    }

    #[test]
    fn test_remove_sheet() {
        let mut wb = Workbook::new();
        wb.add_sheet_named("Data").unwrap();
        wb.activate(1).unwrap();

        let removed = wb.remove_sheet(1).unwrap();
        assert_eq!(removed.name(), "Data");
        assert_eq!(wb.active_sheet(), 0);

        // The last sheet cannot be removed
        assert!(matches!(wb.remove_sheet(0), Err(Error::DeleteLastSheet)));
    }

    #[test]
    fn test_insert_sheet_adjusts_active() {
        let mut wb = Workbook::new();
        wb.add_sheet_named("B").unwrap();
        wb.activate(1).unwrap();

        wb.insert_sheet(0, "First").unwrap();
        assert_eq!(wb.sheet(0).unwrap().name(), "First");
        assert_eq!(wb.active_sheet(), 2);
    }

    #[test]
    fn test_active_sheet_follows_identity() {
        let mut wb = Workbook::new();
        wb.add_sheet_named("B").unwrap();
        wb.add_sheet_named("C").unwrap();
        wb.activate(2).unwrap(); // "C"

        // Removing a sheet before the active one keeps "C" active
        wb.remove_sheet(0).unwrap();
        assert_eq!(wb.sheet(wb.active_sheet()).unwrap().name(), "C");

        // Inserting before it shifts the index, not the identity
        wb.insert_sheet(0, "First").unwrap();
        assert_eq!(wb.sheet(wb.active_sheet()).unwrap().name(), "C");
    }

    #[test]
    fn test_put_sheet() {
        let mut wb = Workbook::new();
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_value("A1", 1.0).unwrap();

        let old = wb.put_sheet("Sheet1", sheet).unwrap();
        assert!(old.is_empty());
        assert_eq!(wb.sheet(0).unwrap().value("A1").unwrap().as_number(), Some(1.0));

        assert!(wb.put_sheet("Nope", Worksheet::new("Nope")).is_err());
    }

    #[test]
    fn test_sheet_by_name() {
        let mut wb = Workbook::new();
        wb.add_sheet_named("Data").unwrap();

        assert!(wb.sheet_by_name("Data").is_some());
        assert!(wb.sheet_by_name("NonExistent").is_none());
        assert_eq!(wb.sheet_index("Data"), Some(1));
    }
}
