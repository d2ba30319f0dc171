//! Package plumbing: part names, options, escaping, defensive limits

use std::io::{Read, Seek};

use crate::error::{XlsxError, XlsxResult};

/// Well-known part names
pub(crate) mod part {
    pub const CONTENT_TYPES: &str = "[Content_Types].xml";
    pub const ROOT_RELS: &str = "_rels/.rels";
    pub const WORKBOOK: &str = "xl/workbook.xml";
    pub const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
    pub const STYLES: &str = "xl/styles.xml";
    pub const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
    pub const CORE_PROPS: &str = "docProps/core.xml";
    pub const APP_PROPS: &str = "docProps/app.xml";
}

/// Reader configuration, including defensive limits
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Maximum permitted uncompressed/compressed ratio per entry; only
    /// entries above [`ReadOptions::ratio_check_threshold`] are checked
    /// (tiny XML parts compress extremely well without being hostile)
    pub max_compression_ratio: f64,
    /// Entry size above which the ratio check applies
    pub ratio_check_threshold: u64,
    /// Budget for the sum of declared uncompressed sizes
    pub max_uncompressed_size: u64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_compression_ratio: 100.0,
            ratio_check_threshold: 1024 * 1024,
            max_uncompressed_size: 4 * 1024 * 1024 * 1024,
        }
    }
}

/// Writer configuration
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// DEFLATE level (0-9); `None` uses the library's balanced default
    pub compression_level: Option<i64>,
    /// Debug mode: STORED entries and indented XML for diffing
    pub debug: bool,
}

/// Deterministic ZIP entry options: fixed epoch timestamp, configured
/// compression
pub(crate) fn zip_entry_options(options: &WriteOptions) -> zip::write::SimpleFileOptions {
    let method = if options.debug {
        zip::CompressionMethod::Stored
    } else {
        zip::CompressionMethod::Deflated
    };

    let mut entry = zip::write::SimpleFileOptions::default()
        .compression_method(method)
        // DateTime::default() is the ZIP epoch, 1980-01-01T00:00:00
        .last_modified_time(zip::DateTime::default());

    if !options.debug {
        entry = entry.compression_level(options.compression_level);
    }

    entry
}

/// Enforce the reader's zip-bomb limits across all entries
pub(crate) fn check_archive_limits<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    options: &ReadOptions,
) -> XlsxResult<()> {
    let mut total: u64 = 0;

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let size = entry.size();
        let compressed = entry.compressed_size();

        total = total.saturating_add(size);

        if size > options.ratio_check_threshold && compressed > 0 {
            let ratio = size as f64 / compressed as f64;
            if ratio > options.max_compression_ratio {
                return Err(XlsxError::ZipBombDetected {
                    path: entry.name().to_string(),
                    ratio,
                });
            }
        }
    }

    if total > options.max_uncompressed_size {
        return Err(XlsxError::DeclaredSizeExceeded {
            declared: total,
            budget: options.max_uncompressed_size,
        });
    }

    Ok(())
}

/// Escape text content for XML
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape attribute values for XML
pub(crate) fn escape_xml_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Map an XML reader failure into a positioned [`XlsxError::XmlParse`]
pub(crate) fn xml_parse_error(part: &str, position: u64, error: quick_xml::Error) -> XlsxError {
    XlsxError::XmlParse {
        part: part.to_string(),
        position,
        message: error.to_string(),
    }
}

/// Decode `_xHHHH_` escape sequences used by Excel in stored strings
/// (`_x000d_` is CR, `_x005f_` an escaped underscore, ...)
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '_' {
            result.push(c);
            continue;
        }

        let mut hex_chars = String::new();
        let mut is_escape = false;

        if chars.peek() == Some(&'x') {
            chars.next();

            for _ in 0..4 {
                if let Some(&ch) = chars.peek() {
                    if ch.is_ascii_hexdigit() {
                        hex_chars.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
            }

            if hex_chars.len() == 4 && chars.peek() == Some(&'_') {
                chars.next();
                if let Ok(code) = u32::from_str_radix(&hex_chars, 16) {
                    if let Some(decoded) = char::from_u32(code) {
                        result.push(decoded);
                        is_escape = true;
                    }
                }
            }
        }

        if !is_escape {
            result.push('_');
            if !hex_chars.is_empty() {
                result.push('x');
                result.push_str(&hex_chars);
            }
        }
    }

    result
}

/// Encode characters Excel cannot store literally as `_xHHHH_`
pub(crate) fn encode_excel_escapes(s: &str) -> String {
    let has_control = s.chars().any(|c| c.is_control() && c != '\n' && c != '\t');
    if !has_control && !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_control() && c != '\n' && c != '\t' {
            result.push_str(&format!("_x{:04X}_", c as u32));
        } else if c == '_'
            && chars.get(i + 1) == Some(&'x')
            && chars[i + 2..].len() >= 5
            && chars[i + 2..i + 6].iter().all(|ch| ch.is_ascii_hexdigit())
            && chars.get(i + 6) == Some(&'_')
        {
            // A literal that would read back as an escape
            result.push_str("_x005F_");
        } else {
            result.push(c);
        }
        i += 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&c"), "a&lt;b&gt;&amp;c");
        assert_eq!(escape_xml_attr("say \"hi\""), "say &quot;hi&quot;");
    }

    #[test]
    fn test_decode_excel_escapes() {
        assert_eq!(decode_excel_escapes("a_x000d_b"), "a\rb");
        assert_eq!(decode_excel_escapes("a_x005f_b"), "a_b");
        assert_eq!(decode_excel_escapes("plain"), "plain");
        assert_eq!(decode_excel_escapes("_xZZZZ_"), "_xZZZZ_"); // not hex
        assert_eq!(decode_excel_escapes("trailing_"), "trailing_");
    }

    #[test]
    fn test_encode_excel_escapes() {
        assert_eq!(encode_excel_escapes("a\u{0007}b"), "a_x0007_b");
        assert_eq!(encode_excel_escapes("plain"), "plain");
        // Text that looks like an escape gets its underscore escaped
        assert_eq!(encode_excel_escapes("_x0041_"), "_x005F_x0041_");
        // Newlines and tabs are legal in cell text
        assert_eq!(encode_excel_escapes("a\nb"), "a\nb");
    }
}
