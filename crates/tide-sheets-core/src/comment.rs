//! Cell comments (notes)

/// A cell comment
///
/// Comments are annotations attached to cells, carrying an author and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellComment {
    /// Author of the comment
    pub author: String,
    /// Comment text content
    pub text: String,
}

impl CellComment {
    /// Create a new comment with the given author and text
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }

    /// Create a comment with just text (empty author)
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            author: String::new(),
            text: text.into(),
        }
    }

    /// Check if this comment has an author
    pub fn has_author(&self) -> bool {
        !self.author.is_empty()
    }
}

impl std::fmt::Display for CellComment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_author() {
            write!(f, "[{}]: {}", self.author, self.text)
        } else {
            write!(f, "{}", self.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_comment() {
        let comment = CellComment::new("Author", "Text");
        assert_eq!(comment.author, "Author");
        assert_eq!(comment.text, "Text");
    }

    #[test]
    fn test_display() {
        assert_eq!(CellComment::new("John", "Hello").to_string(), "[John]: Hello");
        assert_eq!(CellComment::text_only("Hello").to_string(), "Hello");
    }
}
