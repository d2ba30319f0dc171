//! Cell border settings

use super::Color;

/// Border line styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderLineStyle {
    /// No border (default)
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
}

impl BorderLineStyle {
    /// The OOXML border `style` attribute value; `None` has no attribute
    pub fn ooxml_name(&self) -> Option<&'static str> {
        match self {
            BorderLineStyle::None => None,
            BorderLineStyle::Thin => Some("thin"),
            BorderLineStyle::Medium => Some("medium"),
            BorderLineStyle::Thick => Some("thick"),
            BorderLineStyle::Dashed => Some("dashed"),
            BorderLineStyle::Dotted => Some("dotted"),
            BorderLineStyle::Double => Some("double"),
        }
    }

    /// Parse an OOXML border `style` attribute value
    pub fn from_ooxml_name(name: &str) -> Option<Self> {
        match name {
            "thin" => Some(BorderLineStyle::Thin),
            "medium" => Some(BorderLineStyle::Medium),
            "thick" => Some(BorderLineStyle::Thick),
            "dashed" => Some(BorderLineStyle::Dashed),
            "dotted" => Some(BorderLineStyle::Dotted),
            "double" => Some(BorderLineStyle::Double),
            _ => None,
        }
    }
}

/// One side of a cell border
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BorderEdge {
    /// Line style (`None` = no border on this side)
    pub line: BorderLineStyle,
    /// Line color; `None` means the automatic color
    pub color: Option<Color>,
}

impl BorderEdge {
    /// Create an edge with a line style and automatic color
    pub fn new(line: BorderLineStyle) -> Self {
        Self { line, color: None }
    }

    /// Create an edge with a line style and explicit color
    pub fn colored(line: BorderLineStyle, color: Color) -> Self {
        Self {
            line,
            color: Some(color),
        }
    }

    /// Whether this side draws anything
    pub fn is_none(&self) -> bool {
        self.line == BorderLineStyle::None
    }

    fn canonical_key(&self) -> String {
        match self.color {
            Some(c) => format!("{:?}:{}", self.line, c.canonical_key()),
            None => format!("{:?}", self.line),
        }
    }
}

/// Full cell border: one edge per side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BorderStyle {
    pub left: BorderEdge,
    pub right: BorderEdge,
    pub top: BorderEdge,
    pub bottom: BorderEdge,
}

impl BorderStyle {
    /// No border on any side
    pub fn new() -> Self {
        Self::default()
    }

    /// The same edge on all four sides
    pub fn all(edge: BorderEdge) -> Self {
        Self {
            left: edge,
            right: edge,
            top: edge,
            bottom: edge,
        }
    }

    /// Whether no side draws anything
    pub fn is_none(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.top.is_none() && self.bottom.is_none()
    }

    /// Per-side merge: the overlay side wins iff its style is not `None`
    pub fn merged_with(&self, overlay: &BorderStyle) -> BorderStyle {
        let pick = |base: BorderEdge, over: BorderEdge| if over.is_none() { base } else { over };
        BorderStyle {
            left: pick(self.left, overlay.left),
            right: pick(self.right, overlay.right),
            top: pick(self.top, overlay.top),
            bottom: pick(self.bottom, overlay.bottom),
        }
    }

    pub(crate) fn canonical_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.left.canonical_key(),
            self.right.canonical_key(),
            self.top.canonical_key(),
            self.bottom.canonical_key()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_merge_per_side() {
        let base = BorderStyle {
            left: BorderEdge::new(BorderLineStyle::Thin),
            ..Default::default()
        };
        let overlay = BorderStyle {
            right: BorderEdge::new(BorderLineStyle::Thick),
            ..Default::default()
        };

        let merged = base.merged_with(&overlay);
        assert_eq!(merged.left.line, BorderLineStyle::Thin);
        assert_eq!(merged.right.line, BorderLineStyle::Thick);
        assert_eq!(merged.top.line, BorderLineStyle::None);
    }
}
