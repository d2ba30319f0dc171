//! Color representation

use std::fmt;

/// A color value
///
/// Colors are stored as ARGB components, a theme reference with tint, or
/// `Auto` (the application default). The canonical textual form of a
/// concrete color is 8-digit uppercase ARGB hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// Automatic (default) color
    Auto,
    /// Explicit ARGB color
    Argb { a: u8, r: u8, g: u8, b: u8 },
    /// Theme palette color with tint in thousandths (-1000..=1000)
    Theme { index: u32, tint: i16 },
}

impl Color {
    pub const BLACK: Color = Color::Argb {
        a: 0xFF,
        r: 0,
        g: 0,
        b: 0,
    };
    pub const WHITE: Color = Color::Argb {
        a: 0xFF,
        r: 0xFF,
        g: 0xFF,
        b: 0xFF,
    };
    pub const RED: Color = Color::Argb {
        a: 0xFF,
        r: 0xFF,
        g: 0,
        b: 0,
    };

    /// Create an opaque RGB color
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Argb { a: 0xFF, r, g, b }
    }

    /// Create an ARGB color
    pub fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Color::Argb { a, r, g, b }
    }

    /// Create a theme color with tint in thousandths
    pub fn theme(index: u32, tint: i16) -> Self {
        Color::Theme { index, tint }
    }

    /// Parse a 6-digit RGB or 8-digit ARGB hex string
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim_start_matches('#');
        let parse = |range: &str| u8::from_str_radix(range, 16).ok();
        match s.len() {
            6 => Some(Color::Argb {
                a: 0xFF,
                r: parse(&s[0..2])?,
                g: parse(&s[2..4])?,
                b: parse(&s[4..6])?,
            }),
            8 => Some(Color::Argb {
                a: parse(&s[0..2])?,
                r: parse(&s[2..4])?,
                g: parse(&s[4..6])?,
                b: parse(&s[6..8])?,
            }),
            _ => None,
        }
    }

    /// Canonical 8-hex ARGB form of a concrete color
    ///
    /// `Auto` and theme colors have no concrete ARGB value and return `None`.
    pub fn to_argb_hex(&self) -> Option<String> {
        match self {
            Color::Argb { a, r, g, b } => Some(format!("{:02X}{:02X}{:02X}{:02X}", a, r, g, b)),
            _ => None,
        }
    }

    /// Deterministic canonicalization key for style dedup
    pub(crate) fn canonical_key(&self) -> String {
        match self {
            Color::Auto => "auto".to_string(),
            Color::Argb { .. } => self.to_argb_hex().unwrap_or_default(),
            Color::Theme { index, tint } => format!("t{}:{}", index, tint),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::Auto
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Auto => write!(f, "auto"),
            Color::Argb { a, r, g, b } => write!(f, "{:02X}{:02X}{:02X}{:02X}", a, r, g, b),
            Color::Theme { index, tint } => write!(f, "theme({}, {})", index, tint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex("FF0000"), Some(Color::RED));
        assert_eq!(Color::from_hex("#FF0000"), Some(Color::RED));
        assert_eq!(
            Color::from_hex("80FF0000"),
            Some(Color::argb(0x80, 0xFF, 0, 0))
        );
        assert_eq!(Color::from_hex("XYZ"), None);
        assert_eq!(Color::from_hex("FFF"), None);
    }

    #[test]
    fn test_canonical_argb() {
        assert_eq!(Color::RED.to_argb_hex().as_deref(), Some("FFFF0000"));
        assert_eq!(Color::Auto.to_argb_hex(), None);
        assert_eq!(Color::theme(4, 250).to_argb_hex(), None);
    }
}
