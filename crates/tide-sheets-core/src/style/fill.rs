//! Background fill settings

use super::Color;

/// Cell background fill
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FillStyle {
    /// No fill (default)
    #[default]
    None,
    /// Solid color fill
    Solid(Color),
    /// Patterned fill
    Pattern {
        pattern: PatternType,
        foreground: Color,
        background: Color,
    },
}

impl FillStyle {
    /// Create a solid fill
    pub fn solid(color: Color) -> Self {
        FillStyle::Solid(color)
    }

    pub(crate) fn canonical_key(&self) -> String {
        match self {
            FillStyle::None => "none".to_string(),
            FillStyle::Solid(c) => format!("solid:{}", c.canonical_key()),
            FillStyle::Pattern {
                pattern,
                foreground,
                background,
            } => format!(
                "pat:{}:{}:{}",
                pattern.ooxml_name(),
                foreground.canonical_key(),
                background.canonical_key()
            ),
        }
    }
}

/// OOXML pattern fill types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternType {
    Gray125,
    Gray0625,
    LightGray,
    MediumGray,
    DarkGray,
}

impl PatternType {
    /// The OOXML `patternType` attribute value
    pub fn ooxml_name(&self) -> &'static str {
        match self {
            PatternType::Gray125 => "gray125",
            PatternType::Gray0625 => "gray0625",
            PatternType::LightGray => "lightGray",
            PatternType::MediumGray => "mediumGray",
            PatternType::DarkGray => "darkGray",
        }
    }

    /// Parse an OOXML `patternType` attribute value
    pub fn from_ooxml_name(name: &str) -> Option<Self> {
        match name {
            "gray125" => Some(PatternType::Gray125),
            "gray0625" => Some(PatternType::Gray0625),
            "lightGray" => Some(PatternType::LightGray),
            "mediumGray" => Some(PatternType::MediumGray),
            "darkGray" => Some(PatternType::DarkGray),
            _ => None,
        }
    }
}
