//! Document state for pipeline processing.

/// A document being converted by the pipeline.
///
/// `content` evolves through the stages:
///
/// 1. Initially: normalized markdown
/// 2. After `fence` and `inline_code`: markdown with placeholder tokens
/// 3. After `blocks`, `inline` and `extensions`: HTML with placeholder tokens
/// 4. After `restore` and `math`: the finished HTML fragment
#[derive(Debug, Clone)]
pub struct ProcessingDocument {
    /// Content being processed.
    pub content: String,

    /// Names of the stages that have run, in order.
    pub completed: Vec<&'static str>,
}

impl ProcessingDocument {
    /// Create a document from raw markdown.
    ///
    /// Line endings are normalized to `\n` and NUL characters are replaced
    /// with U+FFFD, which keeps placeholder tokens unambiguous.
    pub fn new(markdown: &str) -> Self {
        let content = markdown
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            .replace('\u{0}', "\u{FFFD}");
        Self {
            content,
            completed: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_line_endings() {
        let doc = ProcessingDocument::new("a\r\nb\rc\n");
        assert_eq!(doc.content, "a\nb\nc\n");
    }

    #[test]
    fn test_replaces_nul() {
        let doc = ProcessingDocument::new("a\u{0}b");
        assert_eq!(doc.content, "a\u{FFFD}b");
    }
}
