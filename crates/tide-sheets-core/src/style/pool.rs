//! Style pool for deduplication

use super::Style;
use ahash::AHashMap;

/// Per-sheet style registry
///
/// Insertion-ordered mapping from canonical style key to a dense 0-based
/// id. Index 0 is always the default style. Registering an existing style
/// returns its id without growing the pool.
#[derive(Debug, Clone)]
pub struct StylePool {
    /// All unique styles (index 0 is default)
    styles: Vec<Style>,
    /// Canonical key → id
    index: AHashMap<String, u32>,
}

impl StylePool {
    /// Create a new style pool with the default style at index 0
    pub fn new() -> Self {
        let mut pool = Self {
            styles: Vec::with_capacity(16),
            index: AHashMap::with_capacity(16),
        };

        let default = Style::default();
        pool.index.insert(default.canonical_key(), 0);
        pool.styles.push(default);

        pool
    }

    /// Get or create a style, returning its id
    pub fn get_or_insert(&mut self, style: Style) -> u32 {
        let key = style.canonical_key();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }

        let idx = self.styles.len() as u32;
        self.index.insert(key, idx);
        self.styles.push(style);
        idx
    }

    /// Get a style by id
    pub fn get(&self, index: u32) -> Option<&Style> {
        self.styles.get(index as usize)
    }

    /// Get the default style (id 0)
    pub fn default_style(&self) -> &Style {
        &self.styles[0]
    }

    /// Get the number of registered styles
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Check if the pool only holds the default style
    pub fn is_empty(&self) -> bool {
        self.styles.len() <= 1
    }

    /// Iterate over all styles with their ids, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Style)> {
        self.styles.iter().enumerate().map(|(i, s)| (i as u32, s))
    }
}

impl Default for StylePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{BorderEdge, BorderLineStyle, Color, FillStyle, NumberFormat};

    #[test]
    fn test_slot_zero_is_reserved_for_default() {
        let mut pool = StylePool::new();
        assert_eq!(pool.get(0), Some(&Style::default()));
        assert!(pool.get(1).is_none());

        // Re-registering the default never grows the pool
        assert_eq!(pool.get_or_insert(Style::default()), 0);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_equal_canonical_keys_share_one_id() {
        let mut pool = StylePool::new();

        // Two construction paths that land on the same canonical key
        let via_builder = Style::new().bold(true).fill_color(Color::rgb(0, 64, 128));
        let mut via_fields = Style::default();
        via_fields.font.bold = true;
        via_fields.fill = FillStyle::Solid(Color::rgb(0, 64, 128));

        assert_eq!(via_builder.canonical_key(), via_fields.canonical_key());

        let first = pool.get_or_insert(via_builder);
        assert_eq!(pool.get_or_insert(via_fields), first);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_nested_property_changes_key_and_id() {
        let mut pool = StylePool::new();

        let thin = Style::new().border_all(BorderEdge::new(BorderLineStyle::Thin));
        let thin_red =
            Style::new().border_all(BorderEdge::colored(BorderLineStyle::Thin, Color::RED));

        // A color buried in a border edge still changes the canonical key
        assert_ne!(thin.canonical_key(), thin_red.canonical_key());
        assert_ne!(pool.get_or_insert(thin), pool.get_or_insert(thin_red));
    }

    #[test]
    fn test_ids_stay_dense_under_interleaved_inserts() {
        let mut pool = StylePool::new();

        let a = Style::new().italic(true);
        let b = Style::new().number_format(NumberFormat::Percent);
        let c = Style::new().font_size(9.0);

        let ids = [
            pool.get_or_insert(a.clone()),
            pool.get_or_insert(b.clone()),
            pool.get_or_insert(a),
            pool.get_or_insert(c),
            pool.get_or_insert(b),
        ];
        assert_eq!(ids, [1, 2, 1, 3, 2]);
        assert_eq!(pool.len(), 4);

        // iter() walks insertion order with dense ids
        let indices: Vec<u32> = pool.iter().map(|(i, _)| i).collect();
        assert_eq!(indices, [0, 1, 2, 3]);
    }
}
