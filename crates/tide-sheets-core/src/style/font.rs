//! Font settings

use super::Color;

/// Font settings for a cell or rich-text run
#[derive(Debug, Clone, PartialEq)]
pub struct FontStyle {
    /// Font family name
    pub name: String,
    /// Size in points
    pub size: f64,
    /// Bold
    pub bold: bool,
    /// Italic
    pub italic: bool,
    /// Underline
    pub underline: bool,
    /// Font color
    pub color: Color,
}

impl FontStyle {
    /// Create the default font (Calibri 11)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn with_underline(mut self, underline: bool) -> Self {
        self.underline = underline;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub(crate) fn canonical_key(&self) -> String {
        format!(
            "{}:{}:{}{}{}:{}",
            self.name,
            self.size,
            self.bold as u8,
            self.italic as u8,
            self.underline as u8,
            self.color.canonical_key()
        )
    }
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            name: "Calibri".to_string(),
            size: 11.0,
            bold: false,
            italic: false,
            underline: false,
            color: Color::Auto,
        }
    }
}

impl Eq for FontStyle {}

impl std::hash::Hash for FontStyle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.size.to_bits().hash(state);
        self.bold.hash(state);
        self.italic.hash(state);
        self.underline.hash(state);
        self.color.hash(state);
    }
}
