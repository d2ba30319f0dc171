//! Cell styling types
//!
//! - [`Style`] - Complete cell style
//! - [`FontStyle`] - Font settings
//! - [`FillStyle`] - Background fill
//! - [`BorderStyle`] - Cell borders
//! - [`Alignment`] - Text alignment
//! - [`NumberFormat`] - Number format
//! - [`Color`] - Color representation
//! - [`StylePool`] - Per-sheet dedup registry

mod alignment;
mod border;
mod color;
mod fill;
mod font;
mod number_format;
mod pool;

pub use alignment::{Alignment, HorizontalAlignment, VerticalAlignment};
pub use border::{BorderEdge, BorderLineStyle, BorderStyle};
pub use color::Color;
pub use fill::{FillStyle, PatternType};
pub use font::FontStyle;
pub use number_format::NumberFormat;
pub use pool::StylePool;

/// Complete cell style
///
/// Styles are deduplicated per sheet via [`StylePool`]; cells reference
/// them by index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Style {
    /// Font settings
    pub font: FontStyle,
    /// Fill/background settings
    pub fill: FillStyle,
    /// Border settings
    pub border: BorderStyle,
    /// Text alignment
    pub alignment: Alignment,
    /// Number format
    pub number_format: NumberFormat,
}

impl Style {
    /// Create a new default style
    pub fn new() -> Self {
        Self::default()
    }

    /// Set font to bold
    pub fn bold(mut self, bold: bool) -> Self {
        self.font.bold = bold;
        self
    }

    /// Set font to italic
    pub fn italic(mut self, italic: bool) -> Self {
        self.font.italic = italic;
        self
    }

    /// Set font underline
    pub fn underline(mut self, underline: bool) -> Self {
        self.font.underline = underline;
        self
    }

    /// Set font size in points
    pub fn font_size(mut self, size: f64) -> Self {
        self.font.size = size;
        self
    }

    /// Set font name
    pub fn font_name<S: Into<String>>(mut self, name: S) -> Self {
        self.font.name = name.into();
        self
    }

    /// Set font color
    pub fn font_color(mut self, color: Color) -> Self {
        self.font.color = color;
        self
    }

    /// Set fill color (solid fill)
    pub fn fill_color(mut self, color: Color) -> Self {
        self.fill = FillStyle::Solid(color);
        self
    }

    /// Set the border on all sides
    pub fn border_all(mut self, edge: BorderEdge) -> Self {
        self.border = BorderStyle::all(edge);
        self
    }

    /// Set the number format
    pub fn number_format(mut self, format: NumberFormat) -> Self {
        self.number_format = format;
        self
    }

    /// Set horizontal alignment
    pub fn horizontal_alignment(mut self, align: HorizontalAlignment) -> Self {
        self.alignment.horizontal = align;
        self
    }

    /// Set vertical alignment
    pub fn vertical_alignment(mut self, align: VerticalAlignment) -> Self {
        self.alignment.vertical = align;
        self
    }

    /// Enable text wrapping
    pub fn wrap_text(mut self, wrap: bool) -> Self {
        self.alignment.wrap_text = wrap;
        self
    }

    /// Replace the number format, keeping everything else
    pub fn with_number_format(&self, format: NumberFormat) -> Style {
        let mut style = self.clone();
        style.number_format = format;
        style
    }

    /// Merge an overlay style onto this one.
    ///
    /// Font properties come from the overlay iff they differ from the
    /// default font; fill overrides iff not `None`; borders merge per side;
    /// number format overrides iff not `General`; alignment properties
    /// override when non-default. For a wholesale install use the overlay
    /// directly ("replace" mode).
    pub fn merged_with(&self, overlay: &Style) -> Style {
        let default_font = FontStyle::default();
        let font = FontStyle {
            name: if overlay.font.name != default_font.name {
                overlay.font.name.clone()
            } else {
                self.font.name.clone()
            },
            size: if overlay.font.size != default_font.size {
                overlay.font.size
            } else {
                self.font.size
            },
            bold: if overlay.font.bold != default_font.bold {
                overlay.font.bold
            } else {
                self.font.bold
            },
            italic: if overlay.font.italic != default_font.italic {
                overlay.font.italic
            } else {
                self.font.italic
            },
            underline: if overlay.font.underline != default_font.underline {
                overlay.font.underline
            } else {
                self.font.underline
            },
            color: if overlay.font.color != default_font.color {
                overlay.font.color
            } else {
                self.font.color
            },
        };

        Style {
            font,
            fill: if overlay.fill != FillStyle::None {
                overlay.fill.clone()
            } else {
                self.fill.clone()
            },
            border: self.border.merged_with(&overlay.border),
            alignment: self.alignment.merged_with(&overlay.alignment),
            number_format: if overlay.number_format != NumberFormat::General {
                overlay.number_format.clone()
            } else {
                self.number_format.clone()
            },
        }
    }

    /// Deterministic canonical key, stable across processes.
    ///
    /// Two styles are equal iff their canonical keys are equal.
    pub fn canonical_key(&self) -> String {
        format!(
            "f[{}]|fl[{}]|b[{}]|a[{}]|n[{}]",
            self.font.canonical_key(),
            self.fill.canonical_key(),
            self.border.canonical_key(),
            self.alignment.canonical_key(),
            self.number_format.canonical_key()
        )
    }
}
