//! Number format types

/// Number format for cell display
///
/// Named built-ins map to fixed OOXML format ids. Custom codes are
/// registered dynamically at serialization time, starting at id 164.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NumberFormat {
    /// General format (default)
    #[default]
    General,
    /// 0
    Integer,
    /// 0.00
    Decimal,
    /// $#,##0.00
    Currency,
    /// 0%
    Percent,
    /// 0.00%
    PercentDecimal,
    /// mm-dd-yy
    Date,
    /// m/d/yy h:mm
    DateTime,
    /// h:mm:ss
    Time,
    /// @ (text)
    Text,
    /// Custom Excel format code
    Custom(String),
}

impl NumberFormat {
    /// The fixed OOXML format id for a built-in; `None` for customs
    pub fn ooxml_id(&self) -> Option<u32> {
        match self {
            NumberFormat::General => Some(0),
            NumberFormat::Integer => Some(1),
            NumberFormat::Decimal => Some(2),
            NumberFormat::Currency => Some(7),
            NumberFormat::Percent => Some(9),
            NumberFormat::PercentDecimal => Some(10),
            NumberFormat::Date => Some(14),
            NumberFormat::DateTime => Some(22),
            NumberFormat::Time => Some(21),
            NumberFormat::Text => Some(49),
            NumberFormat::Custom(_) => None,
        }
    }

    /// Map a built-in OOXML format id back to a named format
    pub fn from_ooxml_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(NumberFormat::General),
            1 => Some(NumberFormat::Integer),
            2 => Some(NumberFormat::Decimal),
            7 => Some(NumberFormat::Currency),
            9 => Some(NumberFormat::Percent),
            10 => Some(NumberFormat::PercentDecimal),
            14 => Some(NumberFormat::Date),
            22 => Some(NumberFormat::DateTime),
            21 => Some(NumberFormat::Time),
            49 => Some(NumberFormat::Text),
            _ => None,
        }
    }

    /// The Excel format code
    pub fn format_code(&self) -> &str {
        match self {
            NumberFormat::General => "General",
            NumberFormat::Integer => "0",
            NumberFormat::Decimal => "0.00",
            NumberFormat::Currency => "$#,##0.00_);($#,##0.00)",
            NumberFormat::Percent => "0%",
            NumberFormat::PercentDecimal => "0.00%",
            NumberFormat::Date => "mm-dd-yy",
            NumberFormat::DateTime => "m/d/yy h:mm",
            NumberFormat::Time => "h:mm:ss",
            NumberFormat::Text => "@",
            NumberFormat::Custom(code) => code,
        }
    }

    /// Check if this format displays a serial number as a date/time
    pub fn is_date_like(&self) -> bool {
        match self {
            NumberFormat::Date | NumberFormat::DateTime | NumberFormat::Time => true,
            NumberFormat::Custom(code) => {
                // Heuristic: date placeholders present, no quoted literals
                let lower = code.to_lowercase();
                (lower.contains('y')
                    || lower.contains('d')
                    || lower.contains('h')
                    || lower.contains("mm")
                    || lower.contains('s'))
                    && !lower.contains('"')
                    && !lower.contains('0')
                    && !lower.contains('#')
            }
            _ => false,
        }
    }

    /// Whether an OOXML numFmtId denotes one of the built-in date formats
    pub fn id_is_date_like(id: u32) -> bool {
        matches!(id, 14..=22 | 45..=47)
    }

    pub(crate) fn canonical_key(&self) -> String {
        match self {
            NumberFormat::Custom(code) => format!("c:{}", code),
            other => format!("b:{}", other.ooxml_id().unwrap_or(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ids() {
        assert_eq!(NumberFormat::General.ooxml_id(), Some(0));
        assert_eq!(NumberFormat::Percent.ooxml_id(), Some(9));
        assert_eq!(NumberFormat::Date.ooxml_id(), Some(14));
        assert_eq!(NumberFormat::Custom("0.000".into()).ooxml_id(), None);
    }

    #[test]
    fn test_id_roundtrip() {
        for fmt in [
            NumberFormat::General,
            NumberFormat::Integer,
            NumberFormat::Decimal,
            NumberFormat::Currency,
            NumberFormat::Percent,
            NumberFormat::PercentDecimal,
            NumberFormat::Date,
            NumberFormat::DateTime,
            NumberFormat::Time,
            NumberFormat::Text,
        ] {
            let id = fmt.ooxml_id().unwrap();
            assert_eq!(NumberFormat::from_ooxml_id(id), Some(fmt));
        }
    }

    #[test]
    fn test_date_like() {
        assert!(NumberFormat::Date.is_date_like());
        assert!(NumberFormat::Time.is_date_like());
        assert!(!NumberFormat::Percent.is_date_like());
        assert!(NumberFormat::Custom("yyyy-mm-dd".into()).is_date_like());
        assert!(!NumberFormat::Custom("0.00".into()).is_date_like());
    }
}
