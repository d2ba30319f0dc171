//! Text alignment settings

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HorizontalAlignment {
    /// Type-dependent default
    #[default]
    General,
    Left,
    Center,
    Right,
    Justify,
    CenterContinuous,
}

impl HorizontalAlignment {
    /// The OOXML `horizontal` attribute value; `General` has no attribute
    pub fn ooxml_name(&self) -> Option<&'static str> {
        match self {
            HorizontalAlignment::General => None,
            HorizontalAlignment::Left => Some("left"),
            HorizontalAlignment::Center => Some("center"),
            HorizontalAlignment::Right => Some("right"),
            HorizontalAlignment::Justify => Some("justify"),
            HorizontalAlignment::CenterContinuous => Some("centerContinuous"),
        }
    }

    /// Parse an OOXML `horizontal` attribute value
    pub fn from_ooxml_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(HorizontalAlignment::Left),
            "center" => Some(HorizontalAlignment::Center),
            "right" => Some(HorizontalAlignment::Right),
            "justify" => Some(HorizontalAlignment::Justify),
            "centerContinuous" => Some(HorizontalAlignment::CenterContinuous),
            "general" => Some(HorizontalAlignment::General),
            _ => None,
        }
    }
}

/// Vertical text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerticalAlignment {
    Top,
    Middle,
    /// Excel's default
    #[default]
    Bottom,
}

impl VerticalAlignment {
    /// The OOXML `vertical` attribute value; `Bottom` is the default and has
    /// no attribute
    pub fn ooxml_name(&self) -> Option<&'static str> {
        match self {
            VerticalAlignment::Top => Some("top"),
            VerticalAlignment::Middle => Some("center"),
            VerticalAlignment::Bottom => None,
        }
    }

    /// Parse an OOXML `vertical` attribute value
    pub fn from_ooxml_name(name: &str) -> Option<Self> {
        match name {
            "top" => Some(VerticalAlignment::Top),
            "center" => Some(VerticalAlignment::Middle),
            "bottom" => Some(VerticalAlignment::Bottom),
            _ => None,
        }
    }
}

/// Complete alignment settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Alignment {
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub wrap_text: bool,
}

impl Alignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every property is at its default
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Property-wise merge: overlay properties win when non-default
    pub fn merged_with(&self, overlay: &Alignment) -> Alignment {
        let default = Alignment::default();
        Alignment {
            horizontal: if overlay.horizontal != default.horizontal {
                overlay.horizontal
            } else {
                self.horizontal
            },
            vertical: if overlay.vertical != default.vertical {
                overlay.vertical
            } else {
                self.vertical
            },
            wrap_text: if overlay.wrap_text != default.wrap_text {
                overlay.wrap_text
            } else {
                self.wrap_text
            },
        }
    }

    pub(crate) fn canonical_key(&self) -> String {
        format!(
            "{:?}:{:?}:{}",
            self.horizontal, self.vertical, self.wrap_text as u8
        )
    }
}
